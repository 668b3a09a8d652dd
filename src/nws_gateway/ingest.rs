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

//! Periodic copy of raw alert data into object storage.

use crate::client::ClientError;
use crate::store::{ObjectStore, StoreError};
use crate::upstream::{Argument, Operation, Upstream};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum IngestError {
    Window(DateTime<Utc>, Duration),
    Upstream(ClientError),
    Serialize(serde_json::Error),
    Store(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(now, window) => write!(f, "window {} before {} is out of range", window, now),
            Self::Upstream(e) => write!(f, "unable to fetch alerts: {}", e),
            Self::Serialize(e) => write!(f, "unable to serialize alerts: {}", e),
            Self::Store(e) => write!(f, "unable to store alerts: {}", e),
        }
    }
}

impl error::Error for IngestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::Serialize(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Window(_, _) => None,
        }
    }
}

/// Fetches alerts issued during the most recent window and stores the raw payload.
///
/// Each run makes exactly one upstream request and one write. Objects are keyed by the
/// UTC time of the run and partitioned by date and hour, for example
/// `noaa/alerts/ingest_date=20221010/ingest_hour=13/alerts-20221010T130000Z.json`.
pub struct IngestionJob {
    upstream: Arc<dyn Upstream>,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    window: Duration,
}

impl IngestionJob {
    pub fn new(upstream: Arc<dyn Upstream>, store: Arc<dyn ObjectStore>, prefix: &str, window: Duration) -> Self {
        IngestionJob {
            upstream,
            store,
            prefix: prefix.trim_end_matches('/').to_owned(),
            window,
        }
    }

    pub fn object_key(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}/ingest_date={}/ingest_hour={}/alerts-{}.json",
            self.prefix,
            now.format("%Y%m%d"),
            now.format("%H"),
            now.format("%Y%m%dT%H%M%SZ"),
        )
    }

    pub fn operation(&self, now: DateTime<Utc>) -> Result<Operation, IngestError> {
        let start = now
            .checked_sub_signed(self.window)
            .ok_or(IngestError::Window(now, self.window))?;

        Ok(Operation::AlertsQuery {
            query: vec![
                Argument::new("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                Argument::new("end", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        })
    }

    /// Run a single ingestion, returning the key the payload was written to.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<String, IngestError> {
        let operation = self.operation(now)?;
        let payload = self
            .upstream
            .invoke(&operation)
            .await
            .map_err(IngestError::Upstream)?;
        let body = serde_json::to_vec(&payload).map_err(IngestError::Serialize)?;

        let key = self.object_key(now);
        self.store.put_new(&key, body).await.map_err(IngestError::Store)?;
        Ok(key)
    }
}

impl fmt::Debug for IngestionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionJob")
            .field("prefix", &self.prefix)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::{IngestError, IngestionJob};
    use crate::client::ClientError;
    use crate::store::{ObjectStore, StoreError};
    use crate::upstream::{Argument, Operation, Upstream};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use reqwest::{StatusCode, Url};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct AlertsUpstream {
        calls: Mutex<Vec<Operation>>,
        fail: bool,
    }

    #[async_trait]
    impl Upstream for AlertsUpstream {
        async fn invoke(&self, operation: &Operation) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push(operation.clone());
            if self.fail {
                Err(ClientError::Unexpected(
                    StatusCode::SERVICE_UNAVAILABLE,
                    Url::parse("https://api.weather.gov/alerts").unwrap(),
                    None,
                ))
            } else {
                Ok(json!({"type": "FeatureCollection", "features": []}))
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put_new(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
            let mut objects = self.objects.lock().unwrap();
            if objects.iter().any(|(k, _)| k == key) {
                return Err(StoreError::AlreadyExists(key.to_owned()));
            }

            objects.push((key.to_owned(), body));
            Ok(())
        }
    }

    fn job(upstream: Arc<AlertsUpstream>, store: Arc<MemoryStore>) -> IngestionJob {
        IngestionJob::new(upstream, store, "noaa/alerts/", Duration::minutes(15))
    }

    #[test]
    fn test_object_key() {
        let job = job(Arc::default(), Arc::default());
        let now = Utc.with_ymd_and_hms(2022, 10, 10, 7, 5, 9).unwrap();
        assert_eq!(
            "noaa/alerts/ingest_date=20221010/ingest_hour=07/alerts-20221010T070509Z.json",
            job.object_key(now)
        );
    }

    #[tokio::test]
    async fn test_run_once() {
        let upstream = Arc::new(AlertsUpstream::default());
        let store = Arc::new(MemoryStore::default());
        let job = job(upstream.clone(), store.clone());
        let now = Utc.with_ymd_and_hms(2022, 10, 10, 13, 0, 0).unwrap();

        let key = job.run_once(now).await.unwrap();
        assert_eq!(
            "noaa/alerts/ingest_date=20221010/ingest_hour=13/alerts-20221010T130000Z.json",
            key
        );

        assert_eq!(
            vec![Operation::AlertsQuery {
                query: vec![
                    Argument::new("start", "2022-10-10T12:45:00Z"),
                    Argument::new("end", "2022-10-10T13:00:00Z"),
                ],
            }],
            *upstream.calls.lock().unwrap()
        );

        let objects = store.objects.lock().unwrap();
        assert_eq!(1, objects.len());
        let stored: Value = serde_json::from_slice(&objects[0].1).unwrap();
        assert_eq!(json!({"type": "FeatureCollection", "features": []}), stored);
    }

    #[tokio::test]
    async fn test_run_once_never_overwrites() {
        let upstream = Arc::new(AlertsUpstream::default());
        let store = Arc::new(MemoryStore::default());
        let job = job(upstream, store.clone());
        let now = Utc.with_ymd_and_hms(2022, 10, 10, 13, 0, 0).unwrap();

        job.run_once(now).await.unwrap();
        let res = job.run_once(now).await;
        assert!(matches!(res, Err(IngestError::Store(StoreError::AlreadyExists(_)))));
        assert_eq!(1, store.objects.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_run_once_window_out_of_range() {
        let upstream = Arc::new(AlertsUpstream::default());
        let store = Arc::new(MemoryStore::default());
        let job = IngestionJob::new(upstream.clone(), store.clone(), "noaa/alerts", Duration::days(100_000_000));
        let now = Utc.with_ymd_and_hms(2022, 10, 10, 13, 0, 0).unwrap();

        let res = job.run_once(now).await;
        assert!(matches!(res, Err(IngestError::Window(_, _))));
        assert!(upstream.calls.lock().unwrap().is_empty());
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_upstream_failure() {
        let upstream = Arc::new(AlertsUpstream {
            calls: Mutex::default(),
            fail: true,
        });
        let store = Arc::new(MemoryStore::default());
        let job = job(upstream, store.clone());

        let res = job.run_once(Utc::now()).await;
        assert!(matches!(res, Err(IngestError::Upstream(_))));
        assert!(store.objects.lock().unwrap().is_empty());
    }
}
