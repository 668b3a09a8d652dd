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

//! HTTP gateway for api.weather.gov
//!
//! ## Features
//!
//! `nws_gateway` re-exposes the [api.weather.gov] API through a local set of routes. Each
//! route maps to exactly one upstream operation: path and query parameters are extracted and
//! coerced to their declared types, the upstream is called once, and its JSON response is
//! returned unmodified.
//!
//! * Parameters that fail coercion (e.g. `/gridpoints/LWX/abc,70`) are rejected with a `422`
//!   before any upstream request is made.
//! * Any upstream failure (transport errors, non-2xx responses, malformed bodies) is returned
//!   as a `502` carrying the upstream error message.
//! * `GET /health` always returns `{"status": "ok"}` without touching the upstream.
//! * `GET /metrics` exposes Prometheus metrics about upstream requests.
//!
//! A second binary, `nws_ingest`, copies alerts from the API into object storage (a local
//! directory or an S3 bucket) on a fixed interval.
//!
//! [api.weather.gov]: https://www.weather.gov/documentation/services-web-api
//!
//! ## Build
//!
//! `nws_gateway` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! git clone git@github.com:56quarters/nws_gateway.git && cd nws_gateway
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Gateway
//!
//! ```text
//! ./nws_gateway --bind 127.0.0.1:8000
//! curl -sS 'http://127.0.0.1:8000/points/38.99,-77.01' | jq
//! curl -sS 'http://127.0.0.1:8000/stations/KBOS/observations?limit=5' | jq
//! ```
//!
//! The api.weather.gov maintainers ask that clients identify themselves. Use `--user-agent`
//! to include contact information for your deployment.
//!
//! ### Ingestion
//!
//! Store alerts from the last 15 minutes under `/var/lib/nws` every 15 minutes:
//!
//! ```text
//! ./nws_ingest --store file --store-path /var/lib/nws
//! ```
//!
//! Or in an S3 bucket, using credentials from the environment:
//!
//! ```text
//! ./nws_ingest --store s3 --bucket noaa-prototype --region us-east-1
//! ```
//!

pub mod client;
pub mod forward;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod route;
pub mod routes;
pub mod store;
pub mod upstream;
