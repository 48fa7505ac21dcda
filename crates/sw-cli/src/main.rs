//! sshw CLI
//!
//! Pick a host from the profile store (or `~/.ssh/config`) and log in, or
//! manage encryption of the store and its master password.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sshw::commands;
use sshw::output::{print_error, print_warning};
use sw_core::config;

#[derive(Parser)]
#[command(name = "sshw")]
#[command(author, version, about = "SSH client wrapper for automatic login")]
#[command(group(
    ArgGroup::new("action")
        .multiple(false)
        .args([
            "encrypt",
            "decrypt",
            "check",
            "set_master_password",
            "change_master_password",
            "remove_master_password",
            "forget_master_password",
        ])
))]
struct Cli {
    /// Log in to the profile with this alias
    alias: Option<String>,

    /// Use hosts from ~/.ssh/config
    #[arg(short = 's', long)]
    ssh_config: bool,

    /// Encrypt passwords and passphrases in the configuration file
    #[arg(long)]
    encrypt: bool,

    /// Decrypt the configuration file
    #[arg(long)]
    decrypt: bool,

    /// Report the encryption status of the configuration file
    #[arg(long)]
    check: bool,

    /// Set the master password
    #[arg(long)]
    set_master_password: bool,

    /// Change the master password
    #[arg(long)]
    change_master_password: bool,

    /// Remove the master password
    #[arg(long)]
    remove_master_password: bool,

    /// Forget the cached master password so the next use prompts for it
    #[arg(long)]
    forget_master_password: bool,

    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.as_deref();
    let unlock = || -> Result<_> {
        let gate = commands::open_gate()?;
        gate.get_master_password()
            .context("Failed to get master password")
    };

    if cli.set_master_password {
        return commands::set_master_password(&commands::open_gate()?);
    }
    if cli.change_master_password {
        return commands::change_master_password(&commands::open_gate()?);
    }
    if cli.remove_master_password {
        return commands::remove_master_password(&commands::open_gate()?);
    }
    if cli.forget_master_password {
        return commands::forget_master_password(&commands::open_gate()?);
    }

    if cli.check {
        return commands::check_command(path);
    }
    if cli.encrypt {
        return commands::encrypt_command(path, unlock);
    }
    if cli.decrypt {
        return commands::decrypt_command(path, unlock);
    }

    let settings = config::load_settings_or_default();
    let tree = commands::load_tree(path, cli.ssh_config, unlock)?;
    if tree.is_empty() {
        print_warning("No configuration found");
        return Ok(());
    }

    match commands::pick_profile(&tree, cli.alias.as_deref())? {
        Some(profile) => commands::login_command(profile, &settings).await,
        None => Ok(()),
    }
}
