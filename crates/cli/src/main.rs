use anyhow::{bail, Context};
use bucketview_core::users::{hash_password, DEFAULT_HASH_COST};
use bucketview_core::{SqliteUserStore, User, UserStore};
use bucketview_types::EmailAddress;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bucketview")]
#[command(about = "BucketView operator account administration")]
struct Cli {
    /// SQLite credential database
    #[arg(long, env = "SQLITE_DB", global = true)]
    database: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Create an operator account
    AddUser {
        /// Email address used to sign in
        email: String,
        /// Initial password
        password: String,
    },
    /// Replace the password of an operator account
    UpdateUser {
        /// Email address of the account
        email: String,
        /// New password
        password: String,
    },
    /// Delete an operator account
    DeleteUser {
        /// Email address of the account
        email: String,
    },
    /// List operator accounts
    ListUsers,
}

impl Commands {
    /// Question asked before a mutating command runs.
    fn confirmation(&self, email: &EmailAddress) -> Option<String> {
        match self {
            Commands::AddUser { .. } => {
                Some(format!("Do you wish to create a new user with the email: {email}?"))
            }
            Commands::UpdateUser { .. } => {
                Some(format!("Do you wish to update the password of: {email}?"))
            }
            Commands::DeleteUser { .. } => {
                Some(format!("Do you wish to delete the following user: {email}?"))
            }
            Commands::ListUsers => None,
        }
    }

    fn email(&self) -> Option<&str> {
        match self {
            Commands::AddUser { email, .. }
            | Commands::UpdateUser { email, .. }
            | Commands::DeleteUser { email } => Some(email),
            Commands::ListUsers => None,
        }
    }
}

/// Prints `question` and waits for Enter.
///
/// End of input (CTRL+D) aborts the command.
fn confirm(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> anyhow::Result<()> {
    writeln!(output, "{question}")?;
    writeln!(output, "Press Enter to continue, or CTRL+C to quit.")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("aborted");
    }
    Ok(())
}

async fn execute(
    command: &Commands,
    email: Option<&EmailAddress>,
    store: &dyn UserStore,
    cost: u32,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    match (command, email) {
        (Commands::AddUser { password, .. }, Some(email)) => {
            writeln!(output, "Creating user...")?;
            let user = User::new(email, password, cost)?;
            store.create(&user).await?;
            writeln!(output, "Successfully created user: {email}")?;
        }
        (Commands::UpdateUser { password, .. }, Some(email)) => {
            writeln!(output, "Updating password...")?;
            let hash = hash_password(password, cost)?;
            store.update_password(email.as_str(), &hash).await?;
            writeln!(output, "Successfully updated user: {email}")?;
        }
        (Commands::DeleteUser { .. }, Some(email)) => {
            writeln!(output, "Deleting user...")?;
            store.delete(email.as_str()).await?;
            writeln!(output, "Successfully deleted user: {email}")?;
        }
        (Commands::ListUsers, _) => {
            let users = store.list().await?;
            if users.is_empty() {
                writeln!(output, "No users found.")?;
            }
            for user in users {
                let state = if user.authenticated { "signed in" } else { "signed out" };
                writeln!(output, "{} ({state})", user.email)?;
            }
        }
        (_, None) => bail!("an email address is required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(database) = cli.database.as_deref() else {
        bail!("no database given: pass --database or set SQLITE_DB");
    };

    let email = cli
        .command
        .email()
        .map(EmailAddress::parse)
        .transpose()
        .context("invalid email address")?;

    if let (Some(email), false) = (email.as_ref(), cli.yes) {
        if let Some(question) = cli.command.confirmation(email) {
            confirm(&question, &mut io::stdin().lock(), &mut io::stdout())?;
        }
    }

    let store = SqliteUserStore::connect(database)
        .await
        .with_context(|| format!("cannot open {}", database.display()))?;

    execute(&cli.command, email.as_ref(), &store, DEFAULT_HASH_COST, &mut io::stdout()).await
}
