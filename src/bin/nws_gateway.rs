// nws_gateway - HTTP gateway for api.weather.gov
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use nws_gateway::client::WeatherGovClient;
use nws_gateway::forward::Forwarder;
use nws_gateway::http::RequestContext;
use nws_gateway::metrics::{InstrumentedUpstream, UpstreamMetrics};
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8000);
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_API_URL: &str = "https://api.weather.gov/";

#[derive(Debug, Parser)]
#[clap(name = "nws_gateway", version = clap::crate_version!())]
struct NwsGatewayApplication {
    /// Base URL for the Weather.gov API
    #[clap(long, env = "NWS_API_URL", default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// User-Agent sent with each request to the Weather.gov API. This should include
    /// contact information for whoever runs the gateway.
    #[clap(long, env = "NWS_USER_AGENT", default_value_t = WeatherGovClient::DEFAULT_USER_AGENT.into())]
    user_agent: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for each request to the Weather.gov API, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to bind to.
    #[clap(long, env = "NWS_GATEWAY_BIND", default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = NwsGatewayApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = WeatherGovClient::new(http_client, &opts.api_url, &opts.user_agent).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize API client", error = %e);
        process::exit(1)
    });

    let routes = nws_gateway::routes::nws_routes().unwrap_or_else(|e| {
        tracing::error!(message = "invalid route table", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::default();
    let metrics = UpstreamMetrics::new(&mut registry);
    let upstream = Arc::new(InstrumentedUpstream::new(client, metrics));
    let forwarder = Forwarder::new(routes, upstream);
    tracing::info!(message = "loaded routes", routes = forwarder.table().len(), api_url = %opts.api_url);

    let context = Arc::new(RequestContext::new(forwarder, registry));
    let app = nws_gateway::http::router(context);
    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    let server = server.serve(app.into_make_service());
    tracing::info!(message = "server started", address = %server.local_addr());

    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
