use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Upstream inference server, without trailing slash.
    pub ollama_base_url: String,
    pub token_db_path: PathBuf,
    /// Route prefix, either empty or `/segment[/segment…]` with no trailing slash.
    pub base_path: String,
    pub connect_timeout: Duration,
    /// Idle bound per upstream read. `None` leaves long generations unbounded.
    pub read_timeout: Option<Duration>,
    pub stream_buffer: usize,
    pub log_level: String,
    pub log_format: LogFormat,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| std::env::var(key).ok())
}

impl Config {
    /// Build a config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ollama_base_url = normalize_base_url(
            &get("OLLAMA_BASE_URL").unwrap_or_else(|| "http://localhost:11434".into()),
        )?;

        let port = match get("GATEWAY_PORT") {
            Some(v) => v.parse().context("GATEWAY_PORT must be a port number")?,
            None => 8000,
        };

        let connect_timeout = match get("UPSTREAM_CONNECT_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .context("UPSTREAM_CONNECT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => Duration::from_secs(10),
        };

        let read_timeout = get("UPSTREAM_READ_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .map(Duration::from_secs)
                    .context("UPSTREAM_READ_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?;

        let stream_buffer = match get("STREAM_BUFFER_CHUNKS") {
            Some(v) => v
                .parse::<usize>()
                .context("STREAM_BUFFER_CHUNKS must be a positive integer")?
                .max(1),
            None => 32,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };

        Ok(Config {
            port,
            ollama_base_url,
            token_db_path: get("TOKEN_DB_PATH")
                .unwrap_or_else(|| "tokens.db".into())
                .into(),
            base_path: normalize_base_path(&get("BASE_PATH").unwrap_or_default()),
            connect_timeout,
            read_timeout,
            stream_buffer,
            log_level: get("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|| "info".into()),
            log_format,
        })
    }
}

fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .with_context(|| format!("OLLAMA_BASE_URL is not a valid URL: {}", raw))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("OLLAMA_BASE_URL must use http or https, got '{}'", parsed.scheme());
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
