use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{BulkResponse, BulkResponseItem, IndexClient, TransportError};
use crate::failure::FailureSink;
use crate::record::FailureRecord;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Bulk(usize),
    IndexExists(String),
    CreateIndex(String, Option<String>),
    PutTemplate(String, Vec<String>),
}

/// What the next bulk call should do.
#[derive(Debug, Clone)]
pub(crate) enum BulkScript {
    AcceptAll,
    Reject(Vec<usize>),
    Fail(String),
    Truncate,
}

/// In-memory store that remembers what was created and records every call.
///
/// Indices and aliases are tracked apart, the way the store keeps them; a
/// name exists if it is either.
#[derive(Default)]
pub(crate) struct MockIndexClient {
    calls: Mutex<Vec<Call>>,
    bodies: Mutex<Vec<String>>,
    indices: Mutex<HashSet<String>>,
    aliases: Mutex<HashSet<String>>,
    scripts: Mutex<VecDeque<BulkScript>>,
    existence_error: Mutex<Option<String>>,
    closed: Mutex<bool>,
}

impl MockIndexClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_alias(self, alias: &str) -> Self {
        self.aliases.lock().unwrap().insert(alias.to_string());
        self
    }

    pub(crate) fn with_index(self, name: &str) -> Self {
        self.indices.lock().unwrap().insert(name.to_string());
        self
    }

    pub(crate) fn indices(&self) -> HashSet<String> {
        self.indices.lock().unwrap().clone()
    }

    pub(crate) fn aliases(&self) -> HashSet<String> {
        self.aliases.lock().unwrap().clone()
    }

    /// Queue behaviours for upcoming bulk calls; once drained every call
    /// accepts all items.
    pub(crate) fn script(&self, script: BulkScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub(crate) fn fail_existence_check(&self, reason: &str) {
        *self.existence_error.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn bulk_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Bulk(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl IndexClient for MockIndexClient {
    async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError> {
        let actions = body.lines().count() / 2;
        self.calls.lock().unwrap().push(Call::Bulk(actions));
        self.bodies.lock().unwrap().push(body);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BulkScript::AcceptAll);

        let items: Vec<BulkResponseItem> = match script {
            BulkScript::AcceptAll => (0..actions).map(|_| BulkResponseItem::created()).collect(),
            BulkScript::Reject(positions) => (0..actions)
                .map(|i| {
                    if positions.contains(&i) {
                        BulkResponseItem::rejected(400, "mapper_parsing_exception", "bad field")
                    } else {
                        BulkResponseItem::created()
                    }
                })
                .collect(),
            BulkScript::Fail(reason) => return Err(TransportError::Other(reason)),
            BulkScript::Truncate => (0..actions.saturating_sub(1))
                .map(|_| BulkResponseItem::created())
                .collect(),
        };

        Ok(BulkResponse {
            errors: items.iter().any(|i| i.failure_cause().is_some()),
            items,
        })
    }

    async fn index_exists(&self, name: &str) -> Result<bool, TransportError> {
        self.calls.lock().unwrap().push(Call::IndexExists(name.to_string()));
        if let Some(reason) = self.existence_error.lock().unwrap().clone() {
            return Err(TransportError::Status { status: 403, body: reason });
        }
        Ok(self.indices.lock().unwrap().contains(name) || self.aliases.lock().unwrap().contains(name))
    }

    async fn create_index(&self, name: &str, write_alias: Option<&str>) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::CreateIndex(
            name.to_string(),
            write_alias.map(str::to_string),
        ));
        self.indices.lock().unwrap().insert(name.to_string());
        if let Some(alias) = write_alias {
            self.aliases.lock().unwrap().insert(alias.to_string());
        }
        Ok(())
    }

    async fn put_template(
        &self,
        name: &str,
        patterns: &[String],
        _template: &Value,
    ) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::PutTemplate(name.to_string(), patterns.to_vec()));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Keeps every failure it is handed.
#[derive(Default)]
pub(crate) struct RecordingFailureSink {
    records: Mutex<Vec<FailureRecord>>,
}

impl RecordingFailureSink {
    pub(crate) fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureSink for RecordingFailureSink {
    async fn record(&self, failure: FailureRecord) {
        self.records.lock().unwrap().push(failure);
    }
}

/// One request as received by [`HttpStub`]; header names are lowercase.
#[cfg(feature = "opensearch")]
#[derive(Debug, Clone)]
pub(crate) struct StubRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: std::collections::HashMap<String, String>,
    pub(crate) body: String,
}

#[cfg(feature = "opensearch")]
type Route = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

/// Minimal HTTP/1.1 server on a loopback port.
///
/// Each connection serves a single request answered by `route(method, path)`
/// and is then closed.
#[cfg(feature = "opensearch")]
pub(crate) struct HttpStub {
    addr: std::net::SocketAddr,
    requests: std::sync::Arc<Mutex<Vec<StubRequest>>>,
}

#[cfg(feature = "opensearch")]
impl HttpStub {
    pub(crate) async fn start<F>(route: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        use std::sync::Arc;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route: Arc<Route> = Arc::new(route);

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let route = route.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, route.as_ref(), &seen).await;
                });
            }
        });

        HttpStub { addr, requests }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(feature = "opensearch")]
async fn serve(
    stream: tokio::net::TcpStream,
    route: &Route,
    seen: &Mutex<Vec<StubRequest>>,
) -> std::io::Result<()> {
    use std::collections::HashMap;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let (status, response) = route(&method, &path);
    seen.lock().unwrap().push(StubRequest {
        method: method.clone(),
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let payload = if method == "HEAD" { "" } else { response.as_str() };
    let head = format!(
        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        payload.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(payload.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}
