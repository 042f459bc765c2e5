//! RedSwan session CLI
//!
//! Drives the session store against the encrypted on-disk store, standing in
//! for the app's login, profile, KYC and accreditation screens.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use redswan_core::auth::NewAccount;
use redswan_core::config::{AuthMode, SessionConfig};
use redswan_core::{SessionAction, SessionStore, User, UserUpdate, VerificationStatus};

#[derive(Parser)]
#[command(name = "redswan")]
#[command(about = "RedSwan investor session CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Secure store directory override
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Authentication backend override (demo or local)
    #[arg(long)]
    auth: Option<AuthMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who is logged in
    Status,
    /// Log in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Log out
    Logout,
    /// Identity verification
    Kyc {
        #[command(subcommand)]
        action: KycCommands,
    },
    /// Accredited investor verification
    Accreditation {
        #[command(subcommand)]
        action: AccreditationCommands,
    },
    /// Profile details
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum KycCommands {
    /// Begin verification with the provider for your country
    Start,
    /// Hand the completed verification over for review
    Submit,
}

#[derive(Subcommand)]
enum AccreditationCommands {
    /// Submit accreditation documents for review
    Submit,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update profile fields
    Set {
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        wallet_address: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                format!("redswan={},redswan_core={}", default_level, default_level)
            }),
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut config = SessionConfig::from_env();
    if let Some(path) = cli.storage_path.clone() {
        config.storage_path = path;
    }
    if let Some(mode) = cli.auth {
        config.auth_mode = mode;
    }

    let session = SessionStore::from_config(&config).context("failed to open secure store")?;
    session.restore().await;

    match cli.command {
        Commands::Status => print_status(&session).await,
        Commands::Login { email, password } => {
            let user = session
                .login(&email, &password)
                .await
                .map_err(|e| fail(SessionAction::Login, e))?;
            println!("Welcome back, {}", user.full_name());
            Ok(())
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let mut account = NewAccount::new(email, password, first_name, last_name);
            if let Some(phone) = phone {
                account = account.with_phone(phone);
            }
            let user = session
                .register_account(account)
                .await
                .map_err(|e| fail(SessionAction::Register, e))?;
            println!("Account created for {}", user.email);
            Ok(())
        }
        Commands::Logout => {
            session
                .logout()
                .await
                .map_err(|e| fail(SessionAction::Logout, e))?;
            println!("Logged out");
            Ok(())
        }
        Commands::Kyc { action } => handle_kyc_command(action, &session).await,
        Commands::Accreditation { action } => handle_accreditation_command(action, &session).await,
        Commands::Profile { action } => handle_profile_command(action, &session).await,
    }
}

async fn handle_kyc_command(action: KycCommands, session: &SessionStore) -> anyhow::Result<()> {
    let user = require_user(session).await?;

    match action {
        KycCommands::Start => {
            if user.kyc_status.is_final() {
                println!("KYC review complete: {}", user.kyc_status.label());
                return Ok(());
            }

            let provider = user.verification_provider();
            println!("Verification provider: {}", provider.name());
            println!("{}", provider.description());

            session
                .advance_kyc(VerificationStatus::InProgress)
                .await
                .map_err(|e| fail(SessionAction::Verification, e))?;
            info!("KYC started with {}", provider.name());
            println!("KYC status: {}", VerificationStatus::InProgress.label());
        }
        KycCommands::Submit => {
            session
                .advance_kyc(VerificationStatus::PendingReview)
                .await
                .map_err(|e| fail(SessionAction::Verification, e))?;
            println!("KYC status: {}", VerificationStatus::PendingReview.label());
        }
    }
    Ok(())
}

async fn handle_accreditation_command(
    action: AccreditationCommands,
    session: &SessionStore,
) -> anyhow::Result<()> {
    require_user(session).await?;

    match action {
        AccreditationCommands::Submit => {
            let user = session
                .advance_accreditation(VerificationStatus::PendingReview)
                .await
                .map_err(|e| fail(SessionAction::Verification, e))?;
            println!("Accreditation status: {}", user.accreditation_status.label());
        }
    }
    Ok(())
}

async fn handle_profile_command(action: ProfileCommands, session: &SessionStore) -> anyhow::Result<()> {
    require_user(session).await?;

    match action {
        ProfileCommands::Set {
            phone,
            wallet_address,
            country,
        } => {
            let update = UserUpdate {
                phone,
                wallet_address,
                country,
                ..Default::default()
            };
            if update.is_empty() {
                bail!("Nothing to update");
            }
            session
                .update_user(update)
                .await
                .map_err(|e| fail(SessionAction::UpdateProfile, e))?;
            print_status(session).await?;
        }
    }
    Ok(())
}

async fn print_status(session: &SessionStore) -> anyhow::Result<()> {
    let Some(user) = session.current_user().await else {
        println!("Not logged in");
        return Ok(());
    };

    println!("{} ({}) [{}]", user.full_name(), user.email, user.initials());
    if let Some(phone) = &user.phone {
        println!("Phone:          {}", phone);
    }
    if let Some(address) = &user.wallet_address {
        println!("Wallet:         {}", address);
    }
    println!("Country:        {}", user.country);
    println!("KYC:            {}", user.kyc_status.label());
    println!("Accreditation:  {}", user.accreditation_status.label());
    println!("Member since:   {}", user.created_at.format("%Y-%m-%d"));
    Ok(())
}

async fn require_user(session: &SessionStore) -> anyhow::Result<User> {
    match session.current_user().await {
        Some(user) => Ok(user),
        None => bail!("Please log in first"),
    }
}

/// Log the detail, show the user only the message for this action
fn fail(action: SessionAction, err: redswan_core::Error) -> anyhow::Error {
    error!("{:?} failed: {}", action, err);
    anyhow::anyhow!(action.failure_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_shows_only_the_action_message() {
        let err = fail(
            SessionAction::Verification,
            redswan_core::Error::InvalidStatusTransition {
                from: VerificationStatus::Approved,
                to: VerificationStatus::PendingReview,
            },
        );
        assert_eq!(err.to_string(), SessionAction::Verification.failure_message());

        let err = fail(
            SessionAction::Register,
            redswan_core::Error::DuplicateEmail("ada@example.com".to_string()),
        );
        assert!(!err.to_string().contains("ada@example.com"));
    }

    #[test]
    fn test_cli_parses_accreditation_submit() {
        let cli = Cli::try_parse_from(["redswan", "--auth", "local", "accreditation", "submit"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Accreditation {
                action: AccreditationCommands::Submit
            }
        ));
        assert_eq!(cli.auth, Some(AuthMode::Local));
    }
}
