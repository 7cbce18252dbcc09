// Policy Gate - Main Entry Point
//
// CLI over the admission gate:
// - init / show persisted limits
// - check a single request
// - status / reset for a user
//
// Limiter and budget state live only for the duration of one invocation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use policy_gate::config::{GateConfig, DEFAULT_CONFIG_FILE};
use policy_gate::logging::{self, LoggingConfig};
use policy_gate::metrics;
use policy_gate::rate_limit::WindowMode;
use policy_gate::PolicyGate;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

/// Policy Gate: rate limiting and token budgets for LLM inference
#[derive(Parser, Debug)]
#[command(name = "policy-gate")]
#[command(version)]
#[command(about = "Inference Policy Gate - Rate limiting for LLMs", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE, env = "POLICY_GATE_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (compact, pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Command to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize config
    Init {
        /// Requests per minute
        #[arg(short = 'r', long = "requests", default_value_t = 60)]
        requests: u64,

        /// Requests per hour
        #[arg(long, default_value_t = 1000)]
        requests_hour: u64,

        /// Token budget
        #[arg(short = 't', long, default_value_t = 100000)]
        tokens: u64,

        /// Window mode (fixed, sliding)
        #[arg(long, default_value = "fixed")]
        window_mode: WindowMode,
    },
    /// Show config
    Show,
    /// Check if request allowed
    Check {
        /// User ID
        user: String,

        /// Token count
        tokens: u64,
    },
    /// Show user status
    Status {
        /// User ID
        user: String,
    },
    /// Reset user limits
    Reset {
        /// User ID
        user: String,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut logging_config = LoggingConfig::from_env();
    if args.verbose {
        logging_config.level = "debug".to_string();
    }
    if let Some(format) = &args.log_format {
        logging_config.format = format.clone();
    }
    logging::init_tracing(&logging_config)?;
    metrics::init()?;

    debug!("Policy gate v{} starting", env!("CARGO_PKG_VERSION"));

    let Some(command) = args.command else {
        use clap::CommandFactory;
        Args::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    match command {
        Commands::Init {
            requests,
            requests_hour,
            tokens,
            window_mode,
        } => {
            let mut config = GateConfig::new(requests, requests_hour, tokens);
            config.window_mode = window_mode;
            cmd_init(&args.config, &config)
        }
        Commands::Show => cmd_show(&args.config),
        Commands::Check { user, tokens } => cmd_check(&args.config, &user, tokens),
        Commands::Status { user } => cmd_status(&args.config, &user),
        Commands::Reset { user } => cmd_reset(&args.config, &user),
    }
}

/// Write a new config file
fn cmd_init(path: &Path, config: &GateConfig) -> Result<ExitCode> {
    config.save_to_path(path)?;
    println!("Created config file: {}", path.display());
    println!("{}", config.to_json()?);
    Ok(ExitCode::SUCCESS)
}

/// Print the effective configuration
fn cmd_show(path: &Path) -> Result<ExitCode> {
    let config = GateConfig::load_from_path(path)?;
    println!("{}", config.to_json()?);
    Ok(ExitCode::SUCCESS)
}

/// Check whether a single request would be admitted
fn cmd_check(path: &Path, user: &str, tokens: u64) -> Result<ExitCode> {
    let config = GateConfig::load_from_path(path)?;
    let gate = PolicyGate::from_config(&config);

    let decision = gate.check(user, tokens);

    if decision.allowed {
        println!("Allowed - user: {}, tokens: {}", user, tokens);
        println!("Remaining requests: {}", decision.remaining_requests);
        println!("Remaining tokens: {}", decision.remaining_tokens);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Blocked - user: {}, tokens: {}", user, tokens);
    for reason in decision.reasons() {
        println!("Reason: {}", reason);
    }
    if let Some(secs) = decision.retry_after_secs {
        println!("Retry after: {}s", secs);
    }
    Ok(ExitCode::FAILURE)
}

/// Show quota usage for a user
fn cmd_status(path: &Path, user: &str) -> Result<ExitCode> {
    let config = GateConfig::load_from_path(path)?;
    let gate = PolicyGate::from_config(&config);

    let status = gate.status(user);

    println!("User: {}", user);
    println!(
        "Remaining requests: {}/{} (min)",
        status.requests.minute.remaining(),
        status.requests.minute.limit
    );
    println!(
        "Remaining requests: {}/{} (hour)",
        status.requests.hour.remaining(),
        status.requests.hour.limit
    );
    println!(
        "Token budget: {}/{} (spent: {})",
        status.budget.remaining, status.budget.budget, status.budget.spent
    );
    if !status.window_mode.is_fixed() {
        println!("Window mode: {}", status.window_mode);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reset both quotas for a user
fn cmd_reset(path: &Path, user: &str) -> Result<ExitCode> {
    let config = GateConfig::load_from_path(path)?;
    let gate = PolicyGate::from_config(&config);

    gate.reset(user);

    println!("Reset limits for user: {}", user);
    Ok(ExitCode::SUCCESS)
}
