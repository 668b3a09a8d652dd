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

//! Write-once object storage for ingested payloads.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3Builder, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use std::error;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub enum StoreError {
    AlreadyExists(String),
    InvalidKey(String),
    Io(String, io::Error),
    Remote(String, String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(key) => write!(f, "object {} already exists", key),
            Self::InvalidKey(key) => write!(f, "invalid object key {}", key),
            Self::Io(key, e) => write!(f, "unable to write object {}: {}", key, e),
            Self::Remote(key, msg) => write!(f, "unable to write object {}: {}", key, msg),
        }
    }
}

impl error::Error for StoreError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Object storage that never replaces an existing object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` to `key`, failing with `StoreError::AlreadyExists` if `key` is present.
    async fn put_new(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;
}

/// Object store backed by a local directory, one file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileStore { root: root.into() }
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if valid {
            Ok(self.root.join(relative))
        } else {
            Err(StoreError::InvalidKey(key.to_owned()))
        }
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn put_new(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path(key)?;
        let io_err = |e: io::Error| StoreError::Io(key.to_owned(), e);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(key.to_owned()),
                _ => io_err(e),
            })?;

        let res = async {
            file.write_all(&body).await?;
            file.sync_all().await
        }
        .await;

        drop(file);
        discard_partial(&path, res).await.map_err(io_err)
    }
}

/// Remove a partially written object so a failed write doesn't occupy the key.
async fn discard_partial(path: &Path, res: io::Result<()>) -> io::Result<()> {
    if res.is_err() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(message = "unable to remove partial object", path = %path.display(), error = %e);
        }
    }

    res
}

/// Settings for `S3Store`.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3 compatible services. Enables path-style addressing.
    pub endpoint_url: Option<String>,
}

/// Object store backed by an S3 bucket. Credentials come from the standard AWS chain.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(config: S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region {
            loader = loader.region(Region::new(region));
        }

        let sdk_config = loader.load().await;
        let mut builder = S3Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        S3Store {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_new(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().and_then(|se| se.code()) == Some("PreconditionFailed") => {
                Err(StoreError::AlreadyExists(key.to_owned()))
            }
            Err(e) => Err(StoreError::Remote(key.to_owned(), DisplayErrorContext(&e).to_string())),
        }
    }
}
