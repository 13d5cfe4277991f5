//! Realtime Database REST Client - Hosted Store Adapter
//!
//! Implements the `RemoteStore` port against a Firebase-style realtime
//! database REST API:
//! - `GET/PUT/PATCH/DELETE {base}/{path}.json` for one-shot operations
//! - `X-Firebase-ETag` + `if-match` for versioned reads and conditional writes
//! - `Accept: text/event-stream` for live subscriptions
//!
//! One-shot calls are never retried; a failure is reported once. Live
//! streams reconnect after transport errors until their subscription is
//! dropped.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ETAG, IF_MATCH};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::push_id::PushIdGenerator;
use super::sse::{SseDecoder, StreamEvent};
use super::tree;
use crate::error::StoreError;
use crate::ports::store::{RemoteStore, Revision, StorePath, Subscription, Versioned};

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

/// Configuration for the REST store client.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Database base URL, e.g. `https://team-default-rtdb.firebaseio.com`.
    pub base_url: String,
    /// ID token or database secret sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// Timeout for one-shot requests and for the first live snapshot.
    pub timeout: Duration,
    /// Delay before reopening a dropped live stream.
    pub reconnect_delay: Duration,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Realtime database client over HTTPS.
pub struct RestStore {
    /// Client for one-shot requests (whole-request timeout).
    http: Client,
    /// Client for live streams (connect timeout only).
    stream_http: Client,
    base: Url,
    config: RestStoreConfig,
    ids: PushIdGenerator,
}

impl RestStore {
    /// Create a new client. No request is made until the first operation.
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid database URL: {}", config.base_url))?;
        anyhow::ensure!(
            !base.cannot_be_a_base(),
            "Database URL cannot be a base: {}",
            config.base_url
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to build HTTP client")?;
        let stream_http = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .context("Failed to build streaming HTTP client")?;

        Ok(Self {
            http,
            stream_http,
            base,
            config,
            ids: PushIdGenerator::new(),
        })
    }

    /// `{base}/{path}.json`, with each segment percent-encoded.
    fn url(&self, path: &StorePath) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::InvalidPath(self.config.base_url.clone()))?;
            segments.pop_if_empty();
            let parts = path.segments();
            match parts.split_last() {
                Some((last, parents)) => {
                    segments.extend(parents.iter().copied());
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        if let Some(token) = &self.config.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn send(&self, path: &StorePath, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        check_status(path, response).await
    }
}

/// Map non-success statuses to store errors.
async fn check_status(path: &StorePath, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::PRECONDITION_FAILED {
        return Err(StoreError::PreconditionFailed(path.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_body(path: &StorePath, response: Response) -> Result<Option<Value>, StoreError> {
    let bytes = response.bytes().await?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        path: path.to_string(),
        source,
    })?;
    Ok((!value.is_null()).then_some(value))
}

fn etag_of(response: &Response) -> Result<Revision, StoreError> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(Revision::new)
        .ok_or_else(|| StoreError::Stream("response has no ETag header".to_string()))
}

#[async_trait]
impl RemoteStore for RestStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let url = self.url(path)?;
        let response = self.send(path, self.http.get(url)).await?;
        decode_body(path, response).await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read_versioned(&self, path: &StorePath) -> Result<Versioned, StoreError> {
        let url = self.url(path)?;
        let request = self.http.get(url).header(ETAG_REQUEST_HEADER, "true");
        let response = self.send(path, request).await?;
        let revision = etag_of(&response)?;
        let value = decode_body(path, response).await?;
        Ok(Versioned { value, revision })
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let url = self.url(path)?;
        let stream = LiveStream {
            http: self.stream_http.clone(),
            url,
            path: path.clone(),
            reconnect_delay: self.config.reconnect_delay,
        };
        let first = stream.connect().await?;

        let (tx, rx) = watch::channel(None);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(stream.run(first, tx, ready_tx));
        let abort = task.abort_handle();

        match tokio::time::timeout(self.config.timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(_)) => return Err(StoreError::Closed),
            Err(_) => {
                abort.abort();
                return Err(StoreError::Stream(
                    "timed out waiting for the first snapshot".to_string(),
                ));
            }
        }

        info!("Live subscription established");
        Ok(Subscription::new(path.clone(), rx, move || abort.abort()))
    }

    #[instrument(skip(self, value), fields(path = %path))]
    async fn write(&self, path: &StorePath, value: &Value) -> Result<(), StoreError> {
        let url = self.url(path)?;
        self.send(path, self.http.put(url).json(value)).await?;
        Ok(())
    }

    #[instrument(skip(self, value, expected), fields(path = %path))]
    async fn write_if(
        &self,
        path: &StorePath,
        value: &Value,
        expected: &Revision,
    ) -> Result<Revision, StoreError> {
        let url = self.url(path)?;
        let request = self
            .http
            .put(url)
            .header(ETAG_REQUEST_HEADER, "true")
            .header(IF_MATCH, expected.as_str())
            .json(value);
        let response = self.send(path, request).await?;
        etag_of(&response)
    }

    #[instrument(skip(self, fields), fields(path = %path, children = fields.len()))]
    async fn merge(&self, path: &StorePath, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let url = self.url(path)?;
        self.send(path, self.http.patch(url).json(fields)).await?;
        Ok(())
    }

    fn append(&self, path: &StorePath) -> StorePath {
        // Push ids only use characters valid in a key
        path.trusted_child(&self.ids.next_id())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        let url = self.url(path)?;
        self.send(path, self.http.delete(url)).await?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        let Ok(mut url) = self.url(&StorePath::root()) else {
            return false;
        };
        url.query_pairs_mut().append_pair("shallow", "true");
        match self.http.get(url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                debug!(error = %e, "Store health check failed");
                false
            }
        }
    }
}

/// Why a live stream stopped for good.
enum StreamEnd {
    /// Every receiver was dropped.
    Detached,
    /// The server ended the listener.
    Cancelled(String),
}

/// Background task feeding one subscription.
struct LiveStream {
    http: Client,
    url: Url,
    path: StorePath,
    reconnect_delay: Duration,
}

impl LiveStream {
    async fn connect(&self) -> Result<Response, StoreError> {
        let response = self
            .http
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        check_status(&self.path, response).await
    }

    /// Stream until detached or cancelled; reconnect on transport errors
    /// once the first snapshot was delivered.
    async fn run(
        self,
        first: Response,
        tx: watch::Sender<Option<Value>>,
        ready: oneshot::Sender<Result<(), StoreError>>,
    ) {
        let mut ready = Some(ready);
        let mut response = Some(first);

        loop {
            let current = match response.take() {
                Some(current) => current,
                None => match self.connect().await {
                    Ok(current) => current,
                    Err(e) => {
                        warn!(path = %self.path, error = %e, "Live stream reconnect failed");
                        if self.wait_before_reconnect(&tx).await {
                            continue;
                        }
                        return;
                    }
                },
            };

            match self.pump(current, &tx, &mut ready).await {
                Ok(StreamEnd::Detached) => {
                    debug!(path = %self.path, "Live stream detached");
                    return;
                }
                Ok(StreamEnd::Cancelled(reason)) => {
                    warn!(path = %self.path, reason = %reason, "Live stream cancelled by server");
                    if let Some(ready) = ready.take() {
                        let _ = ready.send(Err(StoreError::Stream(reason)));
                    }
                    return;
                }
                Err(e) => {
                    if let Some(ready) = ready.take() {
                        let _ = ready.send(Err(e));
                        return;
                    }
                    warn!(
                        path = %self.path,
                        error = %e,
                        delay_ms = self.reconnect_delay.as_millis(),
                        "Live stream dropped, reconnecting"
                    );
                    if !self.wait_before_reconnect(&tx).await {
                        return;
                    }
                }
            }
        }
    }

    /// Sleep before reconnecting. False if the subscription went away.
    async fn wait_before_reconnect(&self, tx: &watch::Sender<Option<Value>>) -> bool {
        tokio::select! {
            () = tx.closed() => false,
            () = tokio::time::sleep(self.reconnect_delay) => true,
        }
    }

    async fn pump(
        &self,
        response: Response,
        tx: &watch::Sender<Option<Value>>,
        ready: &mut Option<oneshot::Sender<Result<(), StoreError>>>,
    ) -> Result<StreamEnd, StoreError> {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut snapshot = Value::Null;

        loop {
            let chunk = tokio::select! {
                () = tx.closed() => return Ok(StreamEnd::Detached),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                return Err(StoreError::Stream("server closed the stream".to_string()));
            };
            let chunk = chunk?;

            for raw in decoder.push(&chunk) {
                let event = StreamEvent::from_sse(&raw).map_err(|source| StoreError::Decode {
                    path: self.path.to_string(),
                    source,
                })?;
                match event {
                    StreamEvent::Put(payload) => {
                        tree::set(&mut snapshot, &relative_segments(&payload.path), payload.data);
                    }
                    StreamEvent::Patch(payload) => {
                        let base = relative_segments(&payload.path);
                        if let Value::Object(children) = payload.data {
                            for (key, value) in children {
                                let mut segments = base.clone();
                                segments.push(&key);
                                tree::set(&mut snapshot, &segments, value);
                            }
                        }
                    }
                    StreamEvent::KeepAlive => continue,
                    StreamEvent::Unknown(name) => {
                        debug!(event = %name, "Ignoring unknown stream event");
                        continue;
                    }
                    StreamEvent::Cancel(reason) => return Ok(StreamEnd::Cancelled(reason)),
                    StreamEvent::AuthRevoked(reason) => {
                        return Ok(StreamEnd::Cancelled(format!("auth revoked: {reason}")));
                    }
                }

                let fresh = (!snapshot.is_null()).then(|| snapshot.clone());
                tx.send_if_modified(|current| {
                    if *current == fresh {
                        false
                    } else {
                        *current = fresh;
                        true
                    }
                });
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
        }
    }
}

/// Segments of a stream-relative path (`/` is the subscribed path).
fn relative_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(auth: Option<&str>) -> RestStore {
        RestStore::new(RestStoreConfig {
            base_url: "https://team-default-rtdb.example.com/".to_string(),
            auth_token: auth.map(ToString::to_string),
            ..RestStoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_layout() {
        let store = store(None);
        let path = StorePath::new("attendance/2024-01-01").unwrap();
        assert_eq!(
            store.url(&path).unwrap().as_str(),
            "https://team-default-rtdb.example.com/attendance/2024-01-01.json"
        );
        assert_eq!(
            store.url(&StorePath::root()).unwrap().as_str(),
            "https://team-default-rtdb.example.com/.json"
        );
    }

    #[test]
    fn test_url_encodes_segments_and_auth() {
        let store = store(Some("tok en"));
        let path = StorePath::new("players/a b").unwrap();
        assert_eq!(
            store.url(&path).unwrap().as_str(),
            "https://team-default-rtdb.example.com/players/a%20b.json?auth=tok+en"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = RestStore::new(RestStoreConfig {
            base_url: "not a url".to_string(),
            ..RestStoreConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_segments() {
        assert!(relative_segments("/").is_empty());
        assert_eq!(relative_segments("/p1/name"), vec!["p1", "name"]);
    }
}
