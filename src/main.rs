//! sqlrunner - run a SQL script against a database, statement by statement.

use sql_runner::cli::Cli;
use sql_runner::config::{Config, ProfileConfig};
use sql_runner::error::{Result, SqlRunnerError};
use sql_runner::logging;
use sql_runner::runner::{RunSummary, ScriptRunner};
use tracing::{error, info, warn};

fn main() {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(&cli)) {
        Ok(summary) => {
            info!(
                "Script complete: {} statements, {} failed",
                summary.executed, summary.failed
            );
        }
        Err(e) => {
            error!("{}: {}", e.category(), e);
            error!("Script aborted");
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<RunSummary> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let profile = resolve_profile(cli, &config)?;
    let mut runner = ScriptRunner::open(&profile).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match cli.script_path() {
        Some(path) => runner.run_file(path, &mut out).await,
        None => runner.run(std::io::stdin().lock(), &mut out).await,
    };

    // Closed on both paths; a run error takes precedence over a close error
    if let Err(e) = runner.close().await {
        warn!("{e}");
    }

    result
}

/// Resolves the final profile with precedence:
/// 1. CLI arguments (highest)
/// 2. Named or default profile from the config file
/// 3. `SQLRUNNER_*` environment variables
fn resolve_profile(cli: &Cli, config: &Config) -> Result<ProfileConfig> {
    let mut profile = match cli.profile_name() {
        Some(name) => config.get_profile(Some(name)).cloned().ok_or_else(|| {
            SqlRunnerError::config(format!("Profile '{name}' not found in config file"))
        })?,
        None => config.get_profile(None).cloned().unwrap_or_default(),
    };

    profile.merge(&cli.profile_overrides());
    profile.apply_env_defaults();

    if profile.url.is_none() {
        return Err(SqlRunnerError::config(
            "No connection url configured. Add one to the profile or pass --url",
        ));
    }

    Ok(profile)
}
