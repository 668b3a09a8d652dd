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

use chrono::Utc;
use clap::{Parser, ValueEnum};
use nws_gateway::client::WeatherGovClient;
use nws_gateway::ingest::IngestionJob;
use nws_gateway::store::{FileStore, ObjectStore, S3Config, S3Store};
use reqwest::Client;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_INTERVAL_SECS: u64 = 900;
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_TIMEOUT_MILLIS: u64 = 30000;
const DEFAULT_API_URL: &str = "https://api.weather.gov/";
const DEFAULT_BUCKET: &str = "noaa-prototype";
const DEFAULT_PREFIX: &str = "noaa/alerts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    File,
    S3,
}

#[derive(Debug, Parser)]
#[clap(name = "nws_ingest", version = clap::crate_version!())]
struct NwsIngestApplication {
    /// Base URL for the Weather.gov API
    #[clap(long, env = "NWS_API_URL", default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// User-Agent sent with each request to the Weather.gov API. This should include
    /// contact information for whoever runs the ingestion.
    #[clap(long, env = "NWS_USER_AGENT", default_value_t = WeatherGovClient::DEFAULT_USER_AGENT.into())]
    user_agent: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for fetching alerts from the Weather.gov API, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Fetch alerts at this interval, in seconds. Each run requests alerts from the
    /// preceding interval. Must be between 1 second and 7 days.
    #[clap(
        long,
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS)
    )]
    interval_secs: u64,

    /// Run a single ingestion and exit instead of running on an interval.
    #[clap(long)]
    once: bool,

    /// Where to write alerts.
    #[clap(long, value_enum, default_value_t = StoreKind::File)]
    store: StoreKind,

    /// Root directory for the 'file' store.
    #[clap(long, env = "NWS_STORE_PATH", default_value = ".")]
    store_path: PathBuf,

    /// Bucket for the 's3' store.
    #[clap(long, env = "NWS_BUCKET", default_value_t = DEFAULT_BUCKET.into())]
    bucket: String,

    /// Prefix for all object keys.
    #[clap(long, default_value_t = DEFAULT_PREFIX.into())]
    prefix: String,

    /// AWS region for the 's3' store. By default, the region is determined by the
    /// environment.
    #[clap(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Endpoint for an S3 compatible service for the 's3' store (MinIO, LocalStack, etc.)
    #[clap(long, env = "NWS_S3_ENDPOINT")]
    endpoint_url: Option<String>,
}

#[tokio::main]
async fn main() {
    let opts = NwsIngestApplication::parse();
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

    let store: Arc<dyn ObjectStore> = match opts.store {
        StoreKind::File => Arc::new(FileStore::new(&opts.store_path)),
        StoreKind::S3 => Arc::new(
            S3Store::new(S3Config {
                bucket: opts.bucket.clone(),
                region: opts.region.clone(),
                endpoint_url: opts.endpoint_url.clone(),
            })
            .await,
        ),
    };

    let interval = Duration::from_secs(opts.interval_secs);
    let window = chrono::Duration::from_std(interval).unwrap_or_else(|e| {
        tracing::error!(message = "invalid interval", interval_secs = opts.interval_secs, error = %e);
        process::exit(1)
    });

    let job = IngestionJob::new(Arc::new(client), store, &opts.prefix, window);

    if opts.once {
        if let Err(e) = run(&job).await {
            tracing::error!(message = "alert ingestion failed", error = %e);
            process::exit(1)
        }

        return;
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = async {
        // Wait for either SIGTERM or SIGINT to shutdown
        tokio::select! {
            _ = sigterm() => {}
            _ = sigint() => {}
        }
    };
    tokio::pin!(shutdown);

    tracing::info!(message = "alert ingestion started", api_url = %opts.api_url, store = ?opts.store, interval_secs = opts.interval_secs);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = run(&job).await {
                    tracing::error!(message = "alert ingestion failed", error = %e);
                }
            }
        }
    }

    tracing::info!("alert ingestion shutdown");
}

async fn run(job: &IngestionJob) -> Result<(), nws_gateway::ingest::IngestError> {
    let key = job
        .run_once(Utc::now())
        .instrument(tracing::span!(Level::DEBUG, "nws_alerts_ingestion"))
        .await?;

    tracing::info!(message = "stored alerts", key = %key);
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

#[cfg(test)]
mod test {
    use super::{NwsIngestApplication, MAX_INTERVAL_SECS};
    use clap::Parser;

    #[test]
    fn test_interval_bounds() {
        for bad in ["0".to_owned(), (MAX_INTERVAL_SECS + 1).to_string()] {
            let res = NwsIngestApplication::try_parse_from(["nws_ingest", "--interval-secs", &bad]);
            assert!(res.is_err(), "interval {} accepted", bad);
        }

        let opts = NwsIngestApplication::try_parse_from(["nws_ingest", "--interval-secs", "1"]).unwrap();
        assert_eq!(1, opts.interval_secs);

        let opts = NwsIngestApplication::try_parse_from(["nws_ingest"]).unwrap();
        assert_eq!(900, opts.interval_secs);
    }
}
