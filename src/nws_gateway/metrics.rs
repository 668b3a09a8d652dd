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

use crate::client::ClientError;
use crate::upstream::{Operation, Upstream};
use async_trait::async_trait;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::{Registry, Unit};
use serde_json::Value;
use std::time::{Duration, Instant};

const OUTCOME_SUCCESS: &str = "success";
const OUTCOME_FAILURE: &str = "failure";

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OperationLabels {
    operation: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    operation: String,
    outcome: String,
}

/// Holder for metrics about requests made to the upstream API.
///
/// All metrics are created and registered upon call to `UpstreamMetrics::new()`. Metrics
/// all share the prefix "nws_" and have an "operation" label set to the upstream operation
/// identifier (e.g. `{operation="gridpoint_forecast"}`)
#[derive(Debug, Clone)]
pub struct UpstreamMetrics {
    requests: Family<OutcomeLabels, Counter>,
    duration: Family<OperationLabels, Histogram>,
}

impl UpstreamMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let requests = Family::<OutcomeLabels, Counter>::default();
        let duration =
            Family::<OperationLabels, Histogram>::new_with_constructor(|| Histogram::new(exponential_buckets(0.05, 2.0, 8)));

        reg.register(
            "nws_upstream_requests",
            "Requests made to api.weather.gov by operation and outcome",
            requests.clone(),
        );
        reg.register_with_unit(
            "nws_upstream_request_duration",
            "Duration of requests made to api.weather.gov",
            Unit::Seconds,
            duration.clone(),
        );

        Self { requests, duration }
    }

    pub fn observe(&self, operation: &str, success: bool, elapsed: Duration) {
        let outcome = if success { OUTCOME_SUCCESS } else { OUTCOME_FAILURE };
        self.requests
            .get_or_create(&OutcomeLabels {
                operation: operation.to_owned(),
                outcome: outcome.to_owned(),
            })
            .inc();
        self.duration
            .get_or_create(&OperationLabels {
                operation: operation.to_owned(),
            })
            .observe(elapsed.as_secs_f64());
    }
}

/// `Upstream` that records metrics for every call made through the wrapped implementation.
#[derive(Debug)]
pub struct InstrumentedUpstream<U> {
    inner: U,
    metrics: UpstreamMetrics,
}

impl<U> InstrumentedUpstream<U> {
    pub fn new(inner: U, metrics: UpstreamMetrics) -> Self {
        InstrumentedUpstream { inner, metrics }
    }
}

#[async_trait]
impl<U> Upstream for InstrumentedUpstream<U>
where
    U: Upstream,
{
    async fn invoke(&self, operation: &Operation) -> Result<Value, ClientError> {
        let start = Instant::now();
        let res = self.inner.invoke(operation).await;
        self.metrics.observe(operation.id(), res.is_ok(), start.elapsed());
        res
    }
}
