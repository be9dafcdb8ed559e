use serde_json::Value;
use tracing::{debug, info};

use crate::client::IndexClient;
use crate::config::{SinkConfig, WriteMode};
use crate::error::BootstrapError;

/// Make sure the destination can take writes.
///
/// **Effects**
/// - Applies the configured index template (if any) under
///   `{alias}-index-template` for the `{alias}-*` pattern.
/// - If nothing named after the alias exists yet (neither an index nor an
///   alias), creates `{alias}-000001` bound to the alias as
///   write index ([`WriteMode::Stream`]) or an index named after the alias
///   ([`WriteMode::Collection`]).
///
/// Calling it again once the destination exists only re-applies the
/// template.
pub async fn ensure_destination(
    client: &dyn IndexClient,
    config: &SinkConfig,
) -> Result<(), BootstrapError> {
    if let Some(locator) = &config.template_source {
        let template = load_template(locator).await?;
        let name = config.template_name();
        client
            .put_template(&name, &config.template_patterns(), &template)
            .await?;
        info!(template = %name, source = %locator, "applied index template");
    }

    let alias = &config.index_alias;
    if client.index_exists(alias).await? {
        debug!(alias = %alias, "destination already exists");
        return Ok(());
    }

    match config.write_mode {
        WriteMode::Stream => {
            let index = config.initial_index_name();
            client.create_index(&index, Some(alias)).await?;
            info!(index = %index, alias = %alias, "created initial index with write alias");
        }
        WriteMode::Collection => {
            client.create_index(alias, None).await?;
            info!(index = %alias, "created index");
        }
    }

    Ok(())
}

/// Read a template document from an `http(s)://` URL, a `file://` URL or a
/// plain path. The content must be a JSON object.
pub async fn load_template(locator: &str) -> Result<Value, BootstrapError> {
    let raw = fetch_template(locator).await?;
    let parse_err = |reason: String| BootstrapError::TemplateParse {
        locator: locator.to_string(),
        reason,
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(parse_err("expected a JSON object".to_string())),
        Err(e) => Err(parse_err(e.to_string())),
    }
}

async fn fetch_template(locator: &str) -> Result<String, BootstrapError> {
    let fetch_err = |reason: String| BootstrapError::TemplateFetch {
        locator: locator.to_string(),
        reason,
    };

    let lower = locator.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return fetch_remote(locator).await.map_err(fetch_err);
    }

    let path = locator.strip_prefix("file://").unwrap_or(locator);
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| fetch_err(e.to_string()))
}

#[cfg(feature = "opensearch")]
async fn fetch_remote(url: &str) -> Result<String, String> {
    let resp = reqwest::get(url).await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("status {}", resp.status()));
    }
    resp.text().await.map_err(|e| e.to_string())
}

#[cfg(not(feature = "opensearch"))]
async fn fetch_remote(_url: &str) -> Result<String, String> {
    Err("remote templates require the `opensearch` feature".to_string())
}
