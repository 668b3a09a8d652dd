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

use crate::upstream::{Operation, Resource, Upstream};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    InvalidBaseUrl(String, String),
    Unexpected(StatusCode, Url, Option<String>),
    Decode(Url, reqwest::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::InvalidBaseUrl(url, reason) => write!(f, "invalid base URL {}: {}", url, reason),
            Self::Unexpected(status, url, Some(detail)) => {
                write!(f, "unexpected status {} for {}: {}", status, url, detail)
            }
            Self::Unexpected(status, url, None) => write!(f, "unexpected status {} for {}", status, url),
            Self::Decode(url, e) => write!(f, "invalid response body for {}: {}", url, e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            Self::Decode(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Error document returned by api.weather.gov for non-successful responses.
#[derive(Deserialize, Debug)]
struct Problem {
    title: Option<String>,
    detail: Option<String>,
}

/// Client for api.weather.gov that returns response bodies as opaque JSON.
///
/// The client holds no per-request state and may be shared between any number of
/// concurrent requests. Timeouts are configured on the underlying `reqwest::Client`.
#[derive(Debug)]
pub struct WeatherGovClient {
    client: Client,
    base_url: Url,
    user_agent: String,
}

impl WeatherGovClient {
    pub const DEFAULT_USER_AGENT: &'static str = "NWS Gateway (https://github.com/56quarters/nws_gateway)";
    const JSON_RESPONSE: &'static str = "application/geo+json";

    pub fn new(client: Client, base_url: &str, user_agent: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl(base_url.to_owned(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(
                base_url.to_string(),
                "URL cannot have path segments".to_owned(),
            ));
        }

        Ok(WeatherGovClient {
            client,
            base_url,
            user_agent: user_agent.to_owned(),
        })
    }

    async fn make_request(&self, url: Url) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            let detail = res.json::<Problem>().await.ok().and_then(|p| p.detail.or(p.title));
            Err(ClientError::Unexpected(status, url, detail))
        }
    }

    fn url(&self, resource: &Resource) -> Url {
        let mut url = self.base_url.clone();
        {
            // Checked for cannot-be-a-base URLs at construction.
            if let Ok(mut p) = url.path_segments_mut() {
                p.pop_if_empty().extend(resource.path.iter());
            }
        }

        if !resource.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(resource.query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        url
    }
}

#[async_trait]
impl Upstream for WeatherGovClient {
    async fn invoke(&self, operation: &Operation) -> Result<Value, ClientError> {
        let request_url = self.url(&operation.resource());
        tracing::debug!(message = "making upstream request", operation = operation.id(), url = %request_url);

        let res = self.make_request(request_url.clone()).await?;
        res.json::<Value>()
            .await
            .map_err(|e| ClientError::Decode(request_url, e))
    }
}
