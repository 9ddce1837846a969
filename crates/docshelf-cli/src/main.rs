//! docshelf CLI: offline administration for a docshelf installation.
//!
//! Works directly on the data and document directories, so it can be used
//! to bootstrap accounts or recover a locked-out admin without the server
//! running.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use docshelf_core::credentials::{CredentialStore, DEFAULT_CREDENTIALS_KEY, EditUser, Role};
use docshelf_core::documents::{DocumentRepository, classify_filename};
use docshelf_core::password::PasswordHasher;
use docshelf_storage::FsBackend;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

// ── CLI structure ────────────────────────────────────────────────────

/// docshelf: manage users and documents offline.
#[derive(Parser)]
#[command(
    name = "docshelf",
    version,
    about = "docshelf CLI: manage user accounts and inspect documents",
    long_about = None,
    after_help = format!(
        "{DIM}Examples:{RESET}\n  \
         docshelf users list\n  \
         docshelf users add jane --password s3cret --admin\n  \
         docshelf users edit jane --rename janet\n  \
         docshelf docs check notes.md"
    ),
)]
struct Cli {
    /// Directory holding the credential file.
    #[arg(long, global = true, env = "DOCSHELF_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Directory holding the documents.
    #[arg(long, global = true, env = "DOCSHELF_DOCUMENTS_DIR", default_value = "./user_files")]
    documents_dir: PathBuf,

    /// Credential file name inside the data directory.
    #[arg(long, global = true, env = "DOCSHELF_CREDENTIALS_FILE", default_value = DEFAULT_CREDENTIALS_KEY)]
    credentials_file: String,

    /// bcrypt work factor for new password hashes.
    #[arg(long, global = true, env = "DOCSHELF_BCRYPT_COST")]
    bcrypt_cost: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User account operations.
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Document directory operations.
    Docs {
        #[command(subcommand)]
        action: DocCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List usernames and roles.
    List,
    /// Add a user.
    Add {
        username: String,
        #[arg(long)]
        password: String,
        /// Grant the admin role.
        #[arg(long)]
        admin: bool,
    },
    /// Rename a user or change their password.
    Edit {
        username: String,
        /// New username.
        #[arg(long)]
        rename: Option<String>,
        /// New password.
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a user.
    Delete { username: String },
    /// Check a password. Exits 0 on a match and 1 otherwise.
    Verify {
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// List document names.
    List,
    /// Check whether a name is acceptable for a new document.
    Check { filename: String },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(title: &str) {
    println!("{BOLD}{CYAN}{title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn failure(msg: &str) {
    println!("{RED}{BOLD}✗{RESET} {msg}");
}

// ── Storage ──────────────────────────────────────────────────────────

fn open_credentials(cli: &Cli) -> Result<CredentialStore> {
    let hasher = match cli.bcrypt_cost {
        Some(cost) => PasswordHasher::new(cost)?,
        None => PasswordHasher::default(),
    };
    let backend = FsBackend::open(&cli.data_dir).with_context(|| {
        format!("failed to open data directory {}", cli.data_dir.display())
    })?;
    Ok(CredentialStore::new(Arc::new(backend))
        .with_key(cli.credentials_file.clone())
        .with_hasher(hasher))
}

fn open_documents(cli: &Cli) -> Result<DocumentRepository> {
    let backend = FsBackend::open(&cli.documents_dir).with_context(|| {
        format!(
            "failed to open documents directory {}",
            cli.documents_dir.display()
        )
    })?;
    Ok(DocumentRepository::new(Arc::new(backend)))
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Users { action } => cmd_users(cli, action).await,
        Commands::Docs { action } => cmd_docs(cli, action).await,
    }
}

async fn cmd_users(cli: &Cli, action: &UserCommands) -> Result<ExitCode> {
    let store = open_credentials(cli)?;

    match action {
        UserCommands::List => {
            let records = store.load_all().await?;
            header("Users");
            for record in &records {
                println!("  {} ({})", record.username, record.role);
            }
        }
        UserCommands::Add {
            username,
            password,
            admin,
        } => {
            let role = if *admin { Role::Admin } else { Role::Regular };
            store
                .add(username, password, role)
                .await
                .with_context(|| format!("failed to add {username}"))?;
            success(&format!("{username} was created."));
        }
        UserCommands::Edit {
            username,
            rename,
            password,
        } => {
            let new_username = rename.clone().unwrap_or_else(|| username.clone());
            store
                .edit(EditUser {
                    original_username: username.clone(),
                    new_username: new_username.clone(),
                    new_password: password.clone(),
                })
                .await
                .with_context(|| format!("failed to edit {username}"))?;
            success(&format!("{new_username} was updated."));
        }
        UserCommands::Delete { username } => {
            if store.find(username).await?.is_none() {
                failure(&format!("{username} was not found."));
                return Ok(ExitCode::FAILURE);
            }
            store
                .delete(username)
                .await
                .with_context(|| format!("failed to delete {username}"))?;
            success(&format!("{username} was deleted."));
        }
        UserCommands::Verify { username, password } => {
            if store.authenticate(username, password).await?.is_some() {
                success("Password matches.");
            } else {
                failure("Wrong username or password.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_docs(cli: &Cli, action: &DocCommands) -> Result<ExitCode> {
    match action {
        DocCommands::List => {
            let names = open_documents(cli)?.list().await?;
            header("File List");
            for name in &names {
                println!("  {name}");
            }
        }
        DocCommands::Check { filename } => {
            if let Err(reason) = classify_filename(filename) {
                failure(&reason.to_string());
                return Ok(ExitCode::FAILURE);
            }
            success(&format!("{filename} is a valid document name."));
        }
    }

    Ok(ExitCode::SUCCESS)
}
