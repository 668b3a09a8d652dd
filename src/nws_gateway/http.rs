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

use crate::forward::{Forwarder, GatewayError};
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::registry::Registry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Global state shared by every request handler.
#[derive(Debug)]
pub struct RequestContext {
    forwarder: Forwarder,
    registry: Registry,
}

impl RequestContext {
    pub fn new(forwarder: Forwarder, registry: Registry) -> Self {
        Self { forwarder, registry }
    }
}

#[derive(Serialize, Debug)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

/// Build the gateway router.
///
/// `/health` and `/metrics` are served directly. Every other request is handed to the
/// `Forwarder`, which picks the matching upstream operation or responds with an error.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(text_metrics))
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match prometheus_client::encoding::text::encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn forward(
    State(context): State<Arc<RequestContext>>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, GatewayError> {
    match context.forwarder.forward(&method, uri.path(), &query).await {
        Ok(v) => Ok(Json(v)),
        Err(e) => {
            match &e {
                GatewayError::Upstream(msg) => {
                    tracing::warn!(message = "upstream request failed", path = uri.path(), error = %msg)
                }
                GatewayError::BadRequest(err) => {
                    tracing::debug!(message = "invalid request parameters", path = uri.path(), error = %err)
                }
                _ => {}
            }

            Err(e)
        }
    }
}
