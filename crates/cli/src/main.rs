//! spindrift binary: one relay invocation per run, or a self-looping mode
//! for deployments without an external scheduler.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::Parser,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    spindrift_config::{SpindriftConfig, TrackerStrategy},
    spindrift_core::{
        HandledLogTracker, IdempotencyTracker, MailboxFlagTracker, Orchestrator, RunOutcome,
    },
    spindrift_mail::{GraphMailGateway, MailGateway},
    spindrift_relay::{GarminReplyTransport, ReplyTransport},
};

#[derive(Parser)]
#[command(name = "spindrift", about = "spindrift — satellite weather relay")]
struct Cli {
    /// Run continuously instead of a single invocation.
    #[arg(long = "loop", default_value_t = false)]
    run_loop: bool,

    /// Seconds between iterations in loop mode (overrides config).
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Config file path (otherwise discovered in ./ and ~/.config/spindrift/).
    #[arg(long, env = "SPINDRIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn validate(config: &SpindriftConfig) -> anyhow::Result<()> {
    if config.mail.mailbox.is_empty() {
        anyhow::bail!("config: mail.mailbox is required");
    }
    if config.mail.service_address.is_empty() {
        anyhow::bail!("config: mail.service_address is required");
    }
    if config.graph.tenant_id.is_empty() || config.graph.client_id.is_empty() {
        anyhow::bail!("config: graph credentials are required");
    }
    Ok(())
}

async fn build_tracker(
    config: &SpindriftConfig,
    mail: Arc<dyn MailGateway>,
) -> anyhow::Result<Arc<dyn IdempotencyTracker>> {
    match config.tracker.strategy {
        TrackerStrategy::Mailbox => Ok(Arc::new(MailboxFlagTracker::new(
            mail,
            config.mail.mailbox.clone(),
        ))),
        TrackerStrategy::Log => {
            let path = config
                .tracker
                .log_path
                .clone()
                .or_else(|| spindrift_config::config_dir().map(|d| d.join("handled.jsonl")))
                .unwrap_or_else(|| PathBuf::from("handled.jsonl"));
            Ok(Arc::new(HandledLogTracker::open(path).await?))
        },
    }
}

async fn run_and_log(orchestrator: &Orchestrator) {
    match orchestrator.run_once().await {
        RunOutcome::Idle => info!("nothing to do"),
        RunOutcome::Completed { frames_delivered } => {
            info!(frames_delivered, "invocation completed");
        },
        RunOutcome::Failed { category } => warn!(?category, "invocation failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "spindrift starting");

    let config = match &cli.config {
        Some(path) => spindrift_config::load_config(path)?,
        None => spindrift_config::discover_and_load(),
    };
    validate(&config)?;

    let mail: Arc<dyn MailGateway> = Arc::new(GraphMailGateway::new(&config.graph));
    let transport: Arc<dyn ReplyTransport> = Arc::new(GarminReplyTransport::new());
    let tracker = build_tracker(&config, mail.clone()).await?;

    // No chat collaborator is wired in this deployment; chat requests get a
    // diagnostic reply.
    let orchestrator = Orchestrator::new(&config, mail, transport, tracker, None);

    if cli.run_loop {
        let interval = Duration::from_secs(
            cli.interval_secs
                .unwrap_or(config.runner.loop_interval_secs),
        );
        info!(interval_secs = interval.as_secs(), "entering loop mode");
        loop {
            run_and_log(&orchestrator).await;
            tokio::select! {
                () = tokio::time::sleep(interval) => {},
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                },
            }
        }
    } else {
        run_and_log(&orchestrator).await;
    }

    Ok(())
}
