//! Cadenas: one-time access codes for a physical lock controller.
//!
//! Every subcommand maps onto one service operation and prints its result as
//! JSON on stdout. Errors are printed as `{"error": <kind>, "message": ...}`
//! on stderr with a non-zero exit status. Diagnostics go to stderr through
//! `tracing`; set RUST_LOG=info (or debug) for more.
//!
//! Usage:
//!   cadenas generate
//!   cadenas current
//!   cadenas access --event door_open --code 4821 --agent controller --source 10.0.0.5
//!   cadenas alert create --type tamper --message "case opened" --severity high
//!   cadenas alert resolve 3 --by 10.0.0.9
//!   cadenas logs --page 2 --per-page 10
//!   cadenas alerts --include-resolved
//!   cadenas settings show
//!   cadenas settings set --code-length 6

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cadenas_config::CadenasConfig;
use cadenas_contracts::{
    access::AccessRequest,
    alert::{NewAlert, Severity},
    error::{CadenasError, CadenasResult},
    settings::SettingsPatch,
};
use cadenas_core::LockService;
use cadenas_store::JsonFileStore;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "cadenas.toml";

// ── CLI definition ────────────────────────────────────────────────────────────

/// Cadenas: one-time access codes for a physical lock.
#[derive(Parser)]
#[command(
    name = "cadenas",
    about = "Issue and validate one-time lock codes, journal access, manage alerts",
    long_about = "Issues single-use numeric codes for a lock controller, evaluates\n\
                  door open/close events against them, and keeps an audit trail of\n\
                  access attempts and security alerts in one JSON state document."
)]
struct Cli {
    /// TOML config file (default: ./cadenas.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State document path; overrides config and CADENAS_DATA_FILE.
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new code, replacing the current one.
    Generate,
    /// Show the current code if it is still usable.
    Current,
    /// Report a door event from the controller.
    Access(AccessArgs),
    /// Create or resolve alerts.
    #[command(subcommand)]
    Alert(AlertCommand),
    /// List access journal entries, newest first.
    Logs(PageArgs),
    /// List alerts, newest first.
    Alerts {
        #[command(flatten)]
        page: PageArgs,
        /// Include alerts that have already been resolved.
        #[arg(long)]
        include_resolved: bool,
    },
    /// Show or change the persisted settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct AccessArgs {
    /// door_open or door_close.
    #[arg(long)]
    event: String,
    /// Submitted code. For door_close, empty or NO_CODE means the exit button.
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    agent: Option<String>,
    /// Address of the reporting controller.
    #[arg(long)]
    source: Option<String>,
}

#[derive(Subcommand)]
enum AlertCommand {
    /// Raise a manual alert.
    Create {
        #[arg(long = "type")]
        alert_type: String,
        #[arg(long, default_value = "")]
        message: String,
        /// low, medium (default), high or critical.
        #[arg(long)]
        severity: Option<String>,
    },
    /// Mark an alert as resolved.
    Resolve {
        index: u64,
        /// Who resolved it (recorded on the alert).
        #[arg(long, default_value = "local")]
        by: String,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 20)]
    per_page: usize,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Change one or more settings; omitted values are kept.
    Set {
        #[arg(long)]
        code_length: Option<u32>,
        #[arg(long)]
        code_validity: Option<u64>,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Structured logging on stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    // Unexpected faults are logged and reported generically, never as a backtrace.
    std::panic::set_hook(Box::new(|info| {
        error!(fault = %info, "unexpected fault");
    }));

    let cli = Cli::parse();

    let result = std::panic::catch_unwind(|| run(cli)).unwrap_or_else(|_| {
        Err(CadenasError::Internal { reason: "unexpected fault".to_string() })
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(exit_code(&e))
        }
    }
}

// ── Command dispatch ──────────────────────────────────────────────────────────

fn run(cli: Cli) -> CadenasResult<()> {
    let config = load_config(cli.config.as_deref(), cli.data_file)?;
    let store = JsonFileStore::new(&config.data_file, config.settings.clone());
    let service = LockService::with_system_defaults(Box::new(store), config.retention);

    match cli.command {
        Command::Generate => print_json(&service.generate_code()?),
        Command::Current => print_json(&service.current_code()?),
        Command::Access(args) => {
            let request = AccessRequest {
                event: args.event,
                code: args.code,
                agent: args.agent,
                source_address: args.source,
            };
            print_json(&service.submit_access_event(&request)?)
        }
        Command::Alert(AlertCommand::Create { alert_type, message, severity }) => {
            let severity = severity.map(|s| s.parse::<Severity>()).transpose()?;
            print_json(&service.create_alert(NewAlert { alert_type, message, severity })?)
        }
        Command::Alert(AlertCommand::Resolve { index, by }) => {
            print_json(&service.resolve_alert(index, &by)?)
        }
        Command::Logs(p) => print_json(&service.list_access_logs(p.page, p.per_page)?),
        Command::Alerts { page, include_resolved } => {
            print_json(&service.list_alerts(page.page, page.per_page, include_resolved)?)
        }
        Command::Settings(SettingsCommand::Show) => print_json(&service.settings()?),
        Command::Settings(SettingsCommand::Set { code_length, code_validity, max_attempts }) => {
            let patch = SettingsPatch {
                code_length,
                code_validity_seconds: code_validity,
                max_attempts,
            };
            print_json(&service.update_settings(patch)?)
        }
    }
}

fn load_config(explicit: Option<&Path>, data_file: Option<PathBuf>) -> CadenasResult<CadenasConfig> {
    let config = match explicit {
        Some(path) => CadenasConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            CadenasConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => CadenasConfig::default(),
    };

    let mut config = config.with_env_overrides();
    if let Some(path) = data_file {
        config.data_file = path;
    }
    Ok(config)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_json<T: Serialize>(value: &T) -> CadenasResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CadenasError::Internal {
        reason: format!("cannot render output: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

fn report_error(e: &CadenasError) {
    // Internal faults are not described to the caller beyond their kind.
    let message = match e {
        CadenasError::Internal { .. } => "internal server error".to_string(),
        other => other.to_string(),
    };
    if let CadenasError::Internal { reason } = e {
        error!(reason = %reason, "operation failed");
    }
    eprintln!("{}", serde_json::json!({ "error": e.kind(), "message": message }));
}

fn exit_code(e: &CadenasError) -> u8 {
    match e {
        CadenasError::Validation { .. } => 2,
        CadenasError::NotFound { .. } => 3,
        CadenasError::AlreadyResolved { .. } => 4,
        CadenasError::ConfigError { .. } => 5,
        CadenasError::PersistenceFailure { .. }
        | CadenasError::StorageCorruption { .. }
        | CadenasError::Internal { .. } => 1,
    }
}
