use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use load_forecast::{api, config::Config, io, telemetry};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about = "Weather-driven electricity load forecasting", long_about = None)]
struct Cli {
    /// TOML configuration file (default: config/default.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict load for a weather forecast CSV
    Predict {
        /// Weather forecast CSV with an event_timestamp column
        #[arg(short, long)]
        input: PathBuf,

        /// Days ahead of the earliest timestamp to predict
        #[arg(long)]
        horizon_days: Option<u32>,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Train a new model from historical weather and load
    Train {
        /// Historical CSV with event_timestamp, covariates and the target column
        #[arg(short, long)]
        input: PathBuf,

        /// Leading share of rows used for training, in (0, 1]
        #[arg(long)]
        train_fraction: Option<f64>,
    },
    /// Print the current model metadata as JSON
    Model,
    /// Run the HTTP service
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };
    telemetry::init_tracing(&cfg.logging);

    if let Err(e) = run(cli.command, cfg).await {
        error!(error = %format!("{e:#}"), "command failed");
        std::process::exit(1);
    }
}

async fn run(command: Commands, cfg: Config) -> Result<()> {
    match command {
        Commands::Predict {
            input,
            horizon_days,
            output,
        } => predict(&cfg, input, horizon_days, output),
        Commands::Train {
            input,
            train_fraction,
        } => train(&cfg, input, train_fraction),
        Commands::Model => {
            let metadata = cfg.model_store().metadata()?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            Ok(())
        }
        Commands::Serve => serve(cfg).await,
    }
}

fn predict(
    cfg: &Config,
    input: PathBuf,
    horizon_days: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let horizon_days = horizon_days.unwrap_or(cfg.forecast.default_horizon_days);
    let frame = io::read_frame_path(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let result = cfg.pipeline().predict(&frame, horizon_days)?;
    let summary = result.summary();
    info!(
        count = summary.count,
        mean_mw = summary.mean_mw,
        max_mw = summary.max_mw,
        min_mw = summary.min_mw,
        day_boundaries = result.day_boundaries().len(),
        span_hours = result.span().map(|d| d.num_hours()),
        "predicted load"
    );

    match output {
        Some(path) => {
            io::write_predictions_path(&path, &result)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote predictions");
        }
        None => io::write_predictions(std::io::stdout().lock(), &result)?,
    }
    Ok(())
}

fn train(cfg: &Config, input: PathBuf, train_fraction: Option<f64>) -> Result<()> {
    let mut options = cfg.training.clone();
    if let Some(fraction) = train_fraction {
        options.train_fraction = fraction;
    }

    let frame = io::read_frame_path(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let metadata = cfg.pipeline().retrain(&frame, &options)?;

    match &metadata.metrics {
        Some(m) => info!(
            generation = %metadata.generation,
            training_samples = metadata.training_samples,
            mae = m.mae,
            rmse = m.rmse,
            mape = m.mape,
            r2 = m.r2,
            holdout = m.holdout,
            "model trained"
        ),
        None => info!(
            generation = %metadata.generation,
            training_samples = metadata.training_samples,
            "model trained"
        ),
    }
    Ok(())
}

async fn serve(cfg: Config) -> Result<()> {
    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0 - the service is reachable from the network");
    }

    let app = api::router(api::AppState::new(cfg));

    info!(%addr, "starting load forecast service");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
