//! `estuaryd`: the binary that wires the four core subsystems together
//! (spec 2: proxy core, transport clients, context filter, pairing &
//! enrollment) plus the ambient stack (config, persistence, logging) this
//! repository's spec leaves as "external collaborators".

use std::sync::Arc;

use clap::Parser;
use estuary_daemon::cli::{Cli, Command};
use estuary_daemon::config::{DaemonConfig, TomlConfigProvider};
use estuary_daemon::{control, paths, persistence, slave_client, slave_listener};
use estuary_pairing::{CertificateAuthority, EnrollmentStore, PairingAppState, RateLimitConfig, RateLimiter};
use estuary_proxy::McpProxy;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let config_path = paths::default_config_file(&config_dir);

    match cli.command {
        Command::InitConfig => init_config(&config_path),
        Command::PairingCode => print_pairing_code(&config_path),
        Command::Run => run(&config_dir, &config_path).await,
    }
}

fn init_config(config_path: &std::path::Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("config already exists at {}", config_path.display());
        return Ok(());
    }
    let config = DaemonConfig::scaffold();
    config.save(config_path)?;
    println!("wrote a starter config to {}", config_path.display());
    Ok(())
}

fn print_pairing_code(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    println!("{}", estuary_pairing::current_code(&config.api_key, now));
    Ok(())
}

async fn run(config_dir: &std::path::Path, config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = match DaemonConfig::load(config_path) {
        Ok(config) => config,
        Err(_) => {
            let config = DaemonConfig::scaffold();
            config.save(config_path)?;
            info!(path = %config_path.display(), "no config found, wrote a starter one");
            config
        }
    };

    let config_provider = Arc::new(TomlConfigProvider::new(config_path.to_path_buf(), config.clone()));
    let proxy = McpProxy::new(config_provider.clone()).await?;
    proxy.wait_for_init().await;
    info!("provider clients initialized");

    let contexts_path = paths::contexts_snapshot_path(config_dir);
    let context_store = persistence::load_context_store(&contexts_path);
    if context_store.context_names().is_empty() {
        for seed in &config.contexts {
            context_store.create_context(&seed.name, seed.description.clone(), seed.is_default)?;
        }
    }
    persistence::save_context_store(&contexts_path, &context_store)?;

    let ca_cert_path = paths::ca_cert_path(config_dir);
    let ca_key_path = paths::ca_key_path(config_dir);
    let ca = CertificateAuthority::load_or_generate(&ca_cert_path, &ca_key_path)?;
    let enrollment = Arc::new(EnrollmentStore::new(ca));
    let enrollment_path = paths::enrollment_snapshot_path(config_dir);
    enrollment.import_state(persistence::load_enrollment_snapshot(&enrollment_path));

    let pairing_state = PairingAppState {
        api_key: Some(Arc::new(config.api_key.clone())),
        enrollment: enrollment.clone(),
        pair_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
        enroll_limiter: Arc::new(RateLimiter::new(RateLimitConfig::recommended())),
    };

    let app = control::router(pairing_state, proxy.clone());
    let listener = tokio::net::TcpListener::bind(&config.control_addr).await?;
    info!(addr = %config.control_addr, "control surface listening");
    let control_addr = config.control_addr.clone();
    let serve_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(%err, addr = %control_addr, "control surface exited");
        }
    });

    if let Some(listen_addr) = config.slave_listen_addr.clone() {
        let (notif_tx, _notif_rx) = tokio::sync::mpsc::channel(64);
        let listener = Arc::new(slave_listener::SlaveListener::new(
            proxy.clone(),
            enrollment.clone(),
            notif_tx,
            ca_cert_path.clone(),
            ca_key_path.clone(),
        ));
        tokio::spawn(async move {
            if let Err(err) = listener.run(&listen_addr).await {
                warn!(%err, "slave-attach listener exited");
            }
        });
    }

    if let Some(slave_config) = config.slave.clone() {
        let proxy = proxy.clone();
        tokio::spawn(async move {
            if let Err(err) = slave_client::run_slave_mode(&slave_config, proxy).await {
                warn!(%err, "slave mode exited");
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    persistence::save_context_store(&contexts_path, &context_store)?;
    persistence::save_enrollment_snapshot(&enrollment_path, &enrollment.export_state())?;
    proxy.close().await;
    serve_task.abort();
    Ok(())
}
