//! YAK web console
//!
//! Opens the hypervisor connection, starts the domain refresh loop and
//! serves the login-gated status page.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use yak_common::{VirshConnection, YakConfig};
use yak_web::{
    auth, CredentialVerifier, DomainSnapshotStore, SessionCodec, SessionKeys, SnapshotRefresher,
    StaticFiles, WebServer,
};

#[derive(Parser)]
#[command(name = "yak")]
#[command(about = "YAK - login-gated listing of the VMs on a libvirt host")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "YAK_CONFIG", default_value_os_t = yak_common::default_config_path())]
    config: PathBuf,

    /// HTTP listen address
    #[arg(short, long, env = "YAK_LISTEN")]
    listen: Option<String>,

    /// Directory served under /images/
    #[arg(long, env = "YAK_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// libvirt connection URI
    #[arg(long, env = "YAK_HYPERVISOR_URI")]
    hypervisor_uri: Option<String>,

    /// Also list defined but shut-off domains
    #[arg(long)]
    all_domains: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("YAK web console v{}", yak_common::VERSION);

    let mut config = YakConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(dir) = cli.static_dir {
        config.static_dir = dir;
    }
    if let Some(uri) = cli.hypervisor_uri {
        config.hypervisor.uri = uri;
    }
    if cli.all_domains {
        config.hypervisor.active_only = false;
    }
    config.validate()?;

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen))?;

    let connection = VirshConnection::open(config.hypervisor.uri.clone())
        .await
        .context("failed to open hypervisor connection")?;

    let codec = SessionCodec::new(SessionKeys::generate(), config.session.max_age());
    let verifier = CredentialVerifier::new(auth::host_backend(&config.auth.pam_service));

    let snapshots = Arc::new(DomainSnapshotStore::new());
    let refresher = SnapshotRefresher::new(connection, snapshots.clone(), &config.hypervisor);

    let shutdown = CancellationToken::new();
    let refresh_handle = tokio::spawn(refresher.run(shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                shutdown.cancel();
            }
        });
    }

    let server = WebServer::new(
        verifier,
        codec,
        snapshots,
        StaticFiles::new(config.static_dir.clone()),
    );
    let result = server.serve(addr, shutdown.clone()).await;
    if let Err(e) = &result {
        error!("Web server error: {:#}", e);
    }

    shutdown.cancel();
    match refresh_handle.await {
        Ok(connection) => connection.close(),
        Err(e) => error!("Refresh loop terminated abnormally: {}", e),
    }

    info!("Shutdown complete");
    result
}
