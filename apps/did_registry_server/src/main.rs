use std::net::{Ipv6Addr, SocketAddr};

use clap::Parser as _;
use color_eyre::eyre::Context as _;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(clap::Parser, Debug)]
struct Cli {
	#[clap(long, short, env, default_value = "0")]
	port: u16,
	/// Origin of the browser client, allowed through CORS.
	#[clap(long, env, default_value = did_registry_server::DEFAULT_CLIENT_URL)]
	client_url: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or("info".into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let cli = Cli::parse();

	// Lives for the whole process. Nothing is persisted, so restarting the
	// server forgets every DID.
	let v1_cfg = did_registry_server::v1::RouterConfig {
		registry: Default::default(),
	};
	let router = did_registry_server::RouterConfig {
		v1: v1_cfg,
		client_url: cli.client_url,
	}
	.build()
	.wrap_err("failed to build router")?;

	let listener = tokio::net::TcpListener::bind(SocketAddr::new(
		Ipv6Addr::UNSPECIFIED.into(),
		cli.port,
	))
	.await
	.wrap_err("failed to bind listener")?;
	info!(
		"listening on {}",
		listener
			.local_addr()
			.wrap_err("failed to get listener address")?
	);
	axum::serve(listener, router)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.wrap_err("server error")
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => info!("received ctrl-c, shutting down"),
		Err(err) => {
			warn!("failed to listen for ctrl-c: {err}");
			// Never resolve, rather than shutting down right away.
			std::future::pending::<()>().await
		}
	}
}
