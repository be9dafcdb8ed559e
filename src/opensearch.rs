use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::client::{BulkResponse, IndexClient, TransportError};
use crate::config::ConnectionConfig;

/// [`IndexClient`] speaking the OpenSearch / Elasticsearch REST API.
pub struct OpenSearchClient {
    client: Client,
    /// Base URLs without trailing slash, e.g. "http://localhost:9200".
    hosts: Vec<String>,
    username: Option<String>,
    password: Option<String>,
    next_host: AtomicUsize,
}

impl OpenSearchClient {
    /// Build a client for the hosts, credentials and timeouts in `config`.
    pub fn new(config: &ConnectionConfig) -> Result<Self, TransportError> {
        if config.hosts.is_empty() {
            return Err(TransportError::Other("no hosts configured".to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.socket_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(OpenSearchClient {
            client: builder.build()?,
            hosts: config
                .hosts
                .iter()
                .map(|h| h.trim_end_matches('/').to_string())
                .collect(),
            username: config.username.clone(),
            password: config.password.clone(),
            next_host: AtomicUsize::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        let i = self.next_host.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        format!("{}/{}", self.hosts[i], path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    async fn expect_success(resp: Response) -> Result<Response, TransportError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl IndexClient for OpenSearchClient {
    async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError> {
        let resp = self
            .authorize(self.client.post(self.url("_bulk")))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let bytes = Self::expect_success(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn index_exists(&self, name: &str) -> Result<bool, TransportError> {
        // `HEAD /{name}` answers 200 for an index as well as for an alias.
        let path = urlencoding::encode(name);
        let resp = self.authorize(self.client.head(self.url(&path))).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, name: &str, write_alias: Option<&str>) -> Result<(), TransportError> {
        let mut request = self.authorize(self.client.put(self.url(&urlencoding::encode(name))));
        if let Some(alias) = write_alias {
            request = request.json(&create_index_body(alias));
        }

        Self::expect_success(request.send().await?).await?;
        Ok(())
    }

    async fn put_template(
        &self,
        name: &str,
        patterns: &[String],
        template: &Value,
    ) -> Result<(), TransportError> {
        let path = format!("_template/{}", urlencoding::encode(name));
        let body = template_body(patterns, template);
        let resp = self
            .authorize(self.client.put(self.url(&path)))
            .json(&body)
            .send()
            .await?;

        Self::expect_success(resp).await?;
        Ok(())
    }
}

fn create_index_body(alias: &str) -> Value {
    let mut aliases = serde_json::Map::new();
    aliases.insert(alias.to_string(), serde_json::json!({ "is_write_index": true }));
    serde_json::json!({ "aliases": aliases })
}

/// Template document with its `index_patterns` replaced by `patterns`.
fn template_body(patterns: &[String], template: &Value) -> Value {
    let mut body = match template {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    body.insert("index_patterns".to_string(), serde_json::json!(patterns));
    Value::Object(body)
}
