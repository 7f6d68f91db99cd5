//! HTML pages.
//!
//! Pages are plain functions from a view model to markup. Every interpolated
//! value goes through [`escape`]; URL paths are already percent-encoded by
//! `bucketview_core::paths::url_path` and are escaped as attribute text on top.

use api_shared::Flash;
use bucketview_core::jobs::JobKind;
use bucketview_core::listing::Entry;
use bucketview_core::paths::Breadcrumb;
use bucketview_core::viewer::ViewKind;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;width:100%}\
td,th{padding:.3em .6em;border-bottom:1px solid #ddd;text-align:left}\
.flash{padding:.5em;margin:.5em 0}\
.flash.success{background:#e6f4ea}\
.flash.error{background:#fce8e6}\
nav a{margin-right:.2em}";

/// Escapes text for use in HTML content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&str>, flashes: &[Flash], body: &str) -> String {
    let mut header = String::new();
    if let Some(email) = user {
        let _ = write!(
            header,
            "<p>Signed in as {} | <a href=\"/\">Home</a> | <a href=\"/report_bug\">Report bug</a> | <a href=\"/logout\">Sign out</a></p>",
            escape(email)
        );
    }

    let mut notices = String::new();
    for flash in flashes {
        let _ = write!(
            notices,
            "<div class=\"flash {}\">{}</div>",
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{} - BucketView</title>\
<link rel=\"icon\" href=\"/favicon.ico\"><style>{STYLE}</style></head>\
<body>{header}{notices}{body}</body></html>",
        escape(title)
    )
}

pub fn login_page(flashes: &[Flash]) -> String {
    let body = "<h1>Sign In</h1>\
<form method=\"post\" action=\"/login\">\
<p><label>Email <input type=\"email\" name=\"email\" required></label></p>\
<p><label>Password <input type=\"password\" name=\"password\" required></label></p>\
<p><label><input type=\"checkbox\" name=\"remember_me\" value=\"y\"> Remember Me</label></p>\
<p><button type=\"submit\">Sign In</button></p></form>";
    layout("Sign In", None, flashes, body)
}

/// View model of a directory page.
pub struct ExplorerPage<'a> {
    pub bucket: &'a str,
    pub user: &'a str,
    /// Encoded URL path of the listed directory.
    pub dir_url: &'a str,
    pub breadcrumbs: &'a [Breadcrumb],
    pub entries: &'a [Entry],
    pub flashes: &'a [Flash],
}

pub fn explorer_page(page: &ExplorerPage<'_>) -> String {
    let mut body = String::new();

    body.push_str("<nav>");
    for crumb in page.breadcrumbs {
        if crumb.browsable {
            let _ = write!(
                body,
                "/<a href=\"/explorer/{}\">{}</a>",
                escape(&crumb.url_path),
                escape(&crumb.name)
            );
        } else {
            let _ = write!(body, "/{}", escape(&crumb.name));
        }
    }
    body.push_str("</nav>");

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/explorer/{}\" enctype=\"multipart/form-data\">\
<p><label>New directory <input type=\"text\" name=\"create_dir\"></label></p>\
<p><label>Upload <input type=\"file\" name=\"input_file\"></label></p>\
<p><button type=\"submit\">Submit</button></p></form>",
        escape(page.dir_url)
    );

    body.push_str("<table><tr><th>Name</th><th>Size</th><th>Modified</th><th></th></tr>");
    for entry in page.entries {
        body.push_str(&entry_row(entry));
    }
    body.push_str("</table>");
    body.push_str(JOB_SCRIPT);

    layout(page.bucket, Some(page.user), page.flashes, &body)
}

fn entry_row(entry: &Entry) -> String {
    let url = escape(&entry.url_path);
    let name = escape(&entry.name);

    if entry.is_dir() {
        return format!(
            "<tr><td><a href=\"/explorer/{url}\">{name}/</a></td><td></td><td></td>\
<td><a href=\"/download/dir/{url}\">Download zip</a></td></tr>"
        );
    }

    let mut actions = format!("<a href=\"/download/{url}\">Download</a>");
    if ViewKind::from_path(&entry.path).is_ok() {
        let _ = write!(actions, " <a href=\"/view/{url}\" target=\"_blank\">View</a>");
    }
    let is_geopackage = entry
        .path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gpkg"));
    if is_geopackage {
        for kind in JobKind::ALL {
            let _ = write!(
                actions,
                " <button type=\"button\" onclick=\"startJob('/background_{}/{url}')\">{}</button>",
                kind.route_name(),
                job_label(kind)
            );
        }
    }

    format!(
        "<tr><td>{name}</td><td>{}</td><td>{}</td><td>{actions}</td></tr>",
        escape(entry.pretty_size.as_deref().unwrap_or("")),
        escape(entry.modified.as_deref().unwrap_or(""))
    )
}

fn job_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Reprocess => "Reprocess",
        JobKind::ComputeLeveedArea => "Compute leveed area",
        JobKind::CreateReport => "Create report",
    }
}

const JOB_SCRIPT: &str = "<script>\
function startJob(url){fetch(url).then(function(r){return r.text().then(function(t){\
alert(r.ok?'Job started':'Job request failed ('+r.status+'): '+t);});})\
.catch(function(e){alert('Job request failed: '+e);});}\
</script>";

pub fn bug_report_page(user: &str, flashes: &[Flash]) -> String {
    let body = "<h1>Report Bug</h1>\
<form method=\"post\" action=\"/report_bug\">\
<p><label>Title <input type=\"text\" name=\"bug_title\" required></label></p>\
<p><label>Bug Report<br><textarea class=\"bug-report-body\" name=\"bug_report\" rows=\"10\" cols=\"80\" required></textarea></label></p>\
<p><label><input type=\"checkbox\" name=\"urgent\" value=\"y\"> This is urgent</label></p>\
<p><button type=\"submit\">Submit</button></p></form>";
    layout("Report Bug", Some(user), flashes, body)
}

/// Error body for failed inline views.
pub fn view_error(message: &str) -> String {
    format!(
        "<br><br><center><h1>Error viewing file: {}</h1></center>",
        escape(message)
    )
}
