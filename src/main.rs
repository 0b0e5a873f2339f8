//! Echo server built from flows.
//!
//! Serves the reference routes:
//! - `GET|DELETE /api/test/:value` log and echo the route parameters
//! - `POST|PUT|PATCH /api/test` log and echo the JSON body

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_flows::config::{load_config, ServerConfig};
use http_flows::observability::logging;
use http_flows::{
    chain, endpoint, flow_logger, http_response, Flow, HandlerInput, HttpServer, Log, LogLevel,
    Logger, RouteError, Shutdown,
};

#[derive(Parser)]
#[command(name = "http-flows")]
#[command(about = "Echo server wiring async flows to HTTP routes", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.logging)?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        body_limit_bytes = config.limits.body_limit_bytes,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let mut server = HttpServer::new(config);
    register_echo_routes(&mut server)?;

    let shutdown = Shutdown::new();
    let signals = shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn register_echo_routes(server: &mut HttpServer) -> Result<(), RouteError> {
    let get = params_echo(server.log(), "GET params");
    let delete = params_echo(server.log(), "DELETE params");
    let post = body_echo(server.log(), "POST body");
    let put = body_echo(server.log(), "PUT body");
    let patch = body_echo(server.log(), "PATCH body");

    endpoint::get(server, "/api/test/:value", get)?;
    endpoint::delete(server, "/api/test/:value", delete)?;
    endpoint::post(server, "/api/test", post)?;
    endpoint::put(server, "/api/test", put)?;
    endpoint::patch(server, "/api/test", patch)?;
    Ok(())
}

fn params_echo(instance: &Logger, message: &'static str) -> Flow<HandlerInput, HandlerInput> {
    let log = Flow::from_fn(move |input: HandlerInput| async move {
        Ok(Log::new(message, input.request.params.clone()))
    });

    chain::<HandlerInput>()
        .add(flow_logger(instance, LogLevel::Info, log))
        .add(http_response(200, "request.params"))
}

fn body_echo(instance: &Logger, message: &'static str) -> Flow<HandlerInput, HandlerInput> {
    let log = Flow::from_fn(move |input: HandlerInput| async move {
        Ok(Log::new(message, input.request.body.clone()))
    });

    chain::<HandlerInput>()
        .add(flow_logger(instance, LogLevel::Info, log))
        .add(http_response(200, "request.body"))
}
