use anyhow::Result;
use axum::{error_handling::HandleErrorLayer, routing::get, Router};
use clap::Parser;
use repo_pulse::routes::{analytics::repo_analytics, explore::explore, health::get_health, repos::repo_overview};
use repo_pulse::{metrics, perform_health_check, AppState, Config, RepoPulseError};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, time::Duration};
use tokio_util::sync::CancellationToken;
use tower::{limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{add_extension::AddExtensionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, util::SubscriberInitExt, Layer};

async fn handle_tower_error(error: BoxError) -> RepoPulseError {
	if error.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("Request timeout: {}", error);
		RepoPulseError::RequestTimeout
	} else if error.is::<tower::load_shed::error::Overloaded>() {
		tracing::warn!("Service overloaded: {}", error);
		RepoPulseError::ServiceOverloaded
	} else {
		tracing::error!("Unhandled tower error: {}", error);
		RepoPulseError::TowerError(error)
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();

	// Handle health check flag
	if config.health_check {
		return perform_health_check(&config).await;
	}

	let _ = init_tracing(&config);

	let config = Arc::new(config);
	let shutdown_token = CancellationToken::new();

	let app_state = AppState::build(config.clone(), shutdown_token.clone())?;

	let api_routes = Router::new().merge(repo_analytics()).merge(repo_overview()).merge(explore()).merge(get_health());

	let public_routes = Router::new().route("/metrics", get(metrics::metrics_handler));

	let app = Router::new().merge(api_routes).merge(public_routes).with_state(app_state.clone());

	let app = app.layer(
		ServiceBuilder::new()
			.layer(axum::middleware::from_fn(metrics::metrics_middleware))
			.layer(TraceLayer::new_for_http())
			.layer(HandleErrorLayer::new(|error: BoxError| async move { handle_tower_error(error).await }))
			.layer(RequestBodyLimitLayer::new(config.max_request_size * 1024 * 1024))
			.layer(ConcurrencyLimitLayer::new(config.max_concurrent_req))
			.layer(TimeoutLayer::new(Duration::from_millis(config.task_timeout_ms)))
			.layer(LoadShedLayer::new())
			.layer(AddExtensionLayer::new(config.clone())),
	);

	let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
	tracing::debug!("listening on {}", listener.local_addr()?);

	// Spawn signal handler task with proper shutdown coordination
	let signal_shutdown_token = shutdown_token.clone();
	tokio::spawn(async move {
		tokio::signal::ctrl_c().await.ok();
		tracing::info!("Received Ctrl+C, initiating shutdown...");
		signal_shutdown_token.cancel();
	});

	// Run server with graceful shutdown
	let server_token = shutdown_token.clone();
	let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).with_graceful_shutdown(async move {
		server_token.cancelled().await;
	});

	server.await?;
	tracing::info!("Server stopped");
	tracing::info!("Shutdown complete");

	Ok(())
}

#[must_use]
pub fn init_tracing(config: &Config) -> Option<()> {
	use std::str::FromStr;
	use tracing_subscriber::layer::SubscriberExt;

	let filter = EnvFilter::from_str(config.rust_log.as_deref()?).ok()?;

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(
				tracing_subscriber::fmt::layer()
					.event_format(tracing_subscriber::fmt::format().pretty())
					.with_filter(filter),
			)
		})
		.init();
	None
}
