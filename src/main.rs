//! ddns-updater - keeps DNS records pointed at this host's public IP.

use ddns_updater::config::{Config, Settings};
use ddns_updater::detector::IpDetector;
use ddns_updater::providers::create_client;
use ddns_updater::reconcile::Reconciler;
use ddns_updater::resolver::DnsResolver;
use ddns_updater::scheduler;
use ddns_updater::DdnsError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();
    init_logging(settings.log_level_or_default().into());

    tracing::info!("Starting...");
    let config = match settings.validate() {
        Ok(config) => config,
        Err(DdnsError::Config(problems)) => {
            for problem in &problems {
                tracing::error!("{}. Exiting...", problem);
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!("Configuration: {:?}", config);
    if config.uses_placeholder_api_url() {
        tracing::warn!(
            "API_URL is not set; {} is a placeholder and updates will fail until it points at your provider",
            config.api_url
        );
    }

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let detector = IpDetector::new()?;
    let resolver = match config.nameserver {
        Some(nameserver) => DnsResolver::with_nameserver(nameserver),
        None => DnsResolver::from_system_conf()?,
    };
    let mut client = create_client(&config)?;
    let reconciler = Reconciler::from_config(&config, detector, resolver);

    if config.once {
        scheduler::run_once(&reconciler, &mut client).await;
        return Ok(());
    }

    let shutdown = scheduler::listen_for_shutdown(tokio::signal::ctrl_c()).await;
    scheduler::run(&reconciler, &mut client, config.interval, shutdown).await;
    Ok(())
}
