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

use crate::route::{BindError, Resolution, RouteTable};
use crate::upstream::Upstream;
use axum::http::{Method, StatusCode};
use serde_json::Value;
use std::error;
use std::fmt;
use std::sync::Arc;

/// Every way forwarding a request can fail, each mapped to exactly one status code.
#[derive(Debug)]
pub enum GatewayError {
    /// A parameter was missing or could not be coerced. No upstream call was made.
    BadRequest(BindError),
    /// The upstream call failed for any reason, carrying the upstream's message.
    Upstream(String),
    NotFound,
    MethodNotAllowed,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(e) => write!(f, "{}", e),
            Self::Upstream(msg) => write!(f, "{}", msg),
            Self::NotFound => write!(f, "Not Found"),
            Self::MethodNotAllowed => write!(f, "Method Not Allowed"),
        }
    }
}

impl error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::BadRequest(e) => Some(e),
            _ => None,
        }
    }
}

/// Forwards requests to the upstream operation bound by the matching route.
///
/// Each request results in at most one upstream call, made only after every parameter
/// has been coerced. The forwarder keeps no state between requests.
pub struct Forwarder {
    table: RouteTable,
    upstream: Arc<dyn Upstream>,
}

impl Forwarder {
    pub fn new(table: RouteTable, upstream: Arc<dyn Upstream>) -> Self {
        Forwarder { table, upstream }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub async fn forward(&self, method: &Method, path: &str, query: &[(String, String)]) -> Result<Value, GatewayError> {
        let matched = match self.table.resolve(method, path) {
            Resolution::Matched(m) => m,
            Resolution::MethodNotAllowed => return Err(GatewayError::MethodNotAllowed),
            Resolution::NotFound => return Err(GatewayError::NotFound),
        };

        let operation = matched.bind(query).map_err(GatewayError::BadRequest)?;
        self.upstream
            .invoke(&operation)
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))
    }
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder").field("routes", &self.table.len()).finish()
    }
}
