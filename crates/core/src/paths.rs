//! Mapping between URL paths, local paths and object keys.
//!
//! Browsing URLs carry the absolute local path of a file or directory without
//! its leading `/` (for example `/explorer/flood-data/reports`). Every such path
//! is normalised lexically and confined to the mount point before use, so a
//! crafted URL can never reach outside the bucket.

use crate::{ExplorerError, ExplorerResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'\'')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

/// One step of the breadcrumb navigation above a listing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Breadcrumb {
    pub name: String,
    /// Encoded URL path of the directory, without leading `/`.
    pub url_path: String,
    /// False for ancestors of the mount point, which cannot be browsed.
    pub browsable: bool,
}

/// Path rules for one mounted bucket.
#[derive(Clone, Debug)]
pub struct MountPaths {
    mount_point: PathBuf,
}

impl MountPaths {
    pub fn new(mount_point: PathBuf) -> Self {
        Self { mount_point }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Resolves a path taken from a URL into a local path inside the mount.
    ///
    /// A missing leading `/` is added, `.` segments and duplicate separators are
    /// dropped, and `..` is refused outright instead of being resolved.
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::PathOutsideMount` if the path contains `..` or
    /// does not lie within the mount point.
    pub fn resolve(&self, url_path: &str) -> ExplorerResult<PathBuf> {
        let absolute = if url_path.starts_with('/') {
            url_path.to_string()
        } else {
            format!("/{url_path}")
        };

        let mut resolved = PathBuf::new();
        for component in Path::new(&absolute).components() {
            match component {
                Component::RootDir => resolved.push("/"),
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ExplorerError::PathOutsideMount(url_path.to_string()));
                }
            }
        }

        if !resolved.starts_with(&self.mount_point) {
            return Err(ExplorerError::PathOutsideMount(url_path.to_string()));
        }

        Ok(resolved)
    }

    /// Object key for `filename` uploaded into local directory `dir`.
    ///
    /// The key is `dir` relative to the mount point, joined with `filename`
    /// using `/`; uploads into the mount point itself use the bare filename.
    pub fn object_key(&self, dir: &Path, filename: &str) -> ExplorerResult<String> {
        let relative = dir
            .strip_prefix(&self.mount_point)
            .map_err(|_| ExplorerError::PathOutsideMount(dir.display().to_string()))?;

        let mut parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.push(filename.to_string());

        Ok(parts.join("/"))
    }

    /// Breadcrumbs for every component of `dir`, root first.
    pub fn breadcrumbs(&self, dir: &Path) -> Vec<Breadcrumb> {
        let mut crumbs = Vec::new();
        let mut current = PathBuf::from("/");
        for component in dir.components() {
            if let Component::Normal(part) = component {
                current.push(part);
                crumbs.push(Breadcrumb {
                    name: part.to_string_lossy().into_owned(),
                    url_path: url_path(&current),
                    browsable: current.starts_with(&self.mount_point),
                });
            }
        }
        crumbs
    }
}

/// Encodes an absolute local path for use after a route prefix such as
/// `/explorer/`: the leading `/` is dropped and each segment percent-encoded.
pub fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(
                utf8_percent_encode(&part.to_string_lossy(), SEGMENT).to_string(),
            ),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> MountPaths {
        MountPaths::new(PathBuf::from("/flood-data"))
    }

    #[test]
    fn test_resolve_accepts_paths_inside_mount() {
        let p = paths();
        assert_eq!(p.resolve("flood-data").unwrap(), PathBuf::from("/flood-data"));
        assert_eq!(
            p.resolve("flood-data/reports/2024").unwrap(),
            PathBuf::from("/flood-data/reports/2024")
        );
        assert_eq!(
            p.resolve("/flood-data//reports/./north/").unwrap(),
            PathBuf::from("/flood-data/reports/north")
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let p = paths();
        for raw in [
            "etc/passwd",
            "flood-data/../etc/passwd",
            "flood-data/reports/../../root",
            "flood-data-evil/file",
            "",
        ] {
            assert!(
                matches!(p.resolve(raw), Err(ExplorerError::PathOutsideMount(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_object_key() {
        let p = paths();
        assert_eq!(
            p.object_key(Path::new("/flood-data"), "levee.gpkg").unwrap(),
            "levee.gpkg"
        );
        assert_eq!(
            p.object_key(Path::new("/flood-data/reports/north"), "levee.gpkg")
                .unwrap(),
            "reports/north/levee.gpkg"
        );
        assert!(p.object_key(Path::new("/elsewhere"), "x").is_err());
    }

    #[test]
    fn test_url_path_encodes_segments() {
        assert_eq!(
            url_path(Path::new("/flood-data/area 51/50%#1.csv")),
            "flood-data/area%2051/50%25%231.csv"
        );
    }

    #[test]
    fn test_breadcrumbs_mark_ancestors_of_mount() {
        let p = MountPaths::new(PathBuf::from("/mnt/flood-data"));
        let crumbs = p.breadcrumbs(Path::new("/mnt/flood-data/reports"));

        let names: Vec<&str> = crumbs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["mnt", "flood-data", "reports"]);
        assert!(!crumbs[0].browsable);
        assert!(crumbs[1].browsable);
        assert_eq!(crumbs[2].url_path, "mnt/flood-data/reports");
    }
}
