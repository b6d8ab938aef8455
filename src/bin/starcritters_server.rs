//! Starcritters daily grid trigger server.
//!
//! Reads its configuration from the environment, connects to the hosted
//! database, and serves the trigger endpoint. With `--once` it generates
//! today's grid and exits instead.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use starcritters::config::Config;
use starcritters::storage::{GridStore, PostgrestStore, RelicStore, ReportStore};
use starcritters::transport::{run_server, AppState};
use starcritters::{GridGenerator, StarcrittersError, StarcrittersResult};

enum Mode {
    Serve,
    Once,
}

fn parse_args() -> Mode {
    let mut mode = Mode::Serve;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => mode = Mode::Once,
            "--help" | "-h" => {
                println!("starcritters-server - daily relic grid generator");
                println!();
                println!("USAGE:");
                println!("    starcritters-server [--once]");
                println!();
                println!("OPTIONS:");
                println!("    --once        Generate today's grid and exit");
                println!("    -h, --help    Print help information");
                println!();
                println!("ENVIRONMENT:");
                println!("    SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY (required)");
                println!("    STARCRITTERS_BIND [default: 0.0.0.0:8000]");
                std::process::exit(0);
            }
            other => {
                eprintln!("error: unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }
    mode
}

fn main() -> ExitCode {
    let mode = parse_args();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, retryable = e.is_retryable(), "starcritters-server failed");
            ExitCode::FAILURE
        }
    }
}

fn run(mode: Mode) -> StarcrittersResult<()> {
    let config = Config::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database.url,
        placement = %config.placement,
        "starting"
    );

    // The blocking HTTP client must be built outside the async runtime.
    let store = Arc::new(
        PostgrestStore::new(&config.database)
            .map_err(|e| StarcrittersError::internal(format!("database client: {e}")))?,
    );
    let reports: Arc<dyn ReportStore> = store.clone();
    let relics: Arc<dyn RelicStore> = store.clone();
    let grids: Arc<dyn GridStore> = store;
    let generator = Arc::new(GridGenerator::new(
        reports,
        relics,
        grids,
        Arc::from(config.placement.build()),
        config.policy.clone(),
    )?);

    match mode {
        Mode::Once => {
            let generated = generator.generate_today()?;
            tracing::info!(
                grid_date = %generated.grid.grid_date,
                placed_value_usd = generated.summary.placed_value_usd,
                "Successfully generated grid"
            );
            Ok(())
        }
        Mode::Serve => {
            let state = AppState::new(
                Arc::clone(&generator),
                Some(config.database.service_role_key.clone()),
            );
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| StarcrittersError::internal(format!("tokio runtime: {e}")))?;
            let served = runtime
                .block_on(run_server(config.bind_addr, state))
                .map_err(|e| StarcrittersError::internal(format!("trigger server: {e}")));
            // Last handle to the blocking client is released off the runtime.
            drop(runtime);
            drop(generator);
            served
        }
    }
}
