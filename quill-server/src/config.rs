//! Server configuration
//!
//! Read once from the environment at startup:
//!
//! | variable | default |
//! |---|---|
//! | `QUILL_BIND_ADDR` | `127.0.0.1:8000` |
//! | `QUILL_STORAGE_PATH` | `./quill_data` |
//! | `QUILL_CORS_ORIGINS` | localhost dev origins; `*` or a comma list |
//! | `QUILL_API_TOKENS` | none; `token=user-uuid,...` |
//! | `QUILL_STREAM_CHUNK_BYTES` | `16384` |
//! | `QUILL_STREAM_QUEUE_DEPTH` | `8` |

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_STORAGE_PATH: &str = "./quill_data";

/// Which browser origins may call the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl Default for CorsOrigins {
    fn default() -> Self {
        CorsOrigins::List(vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
            "http://127.0.0.1:3000".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ])
    }
}

/// Tuning for streamed (PDF) responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Bytes per body chunk
    pub chunk_bytes: usize,
    /// Chunks buffered before the encoder blocks
    pub queue_depth: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_bytes: 16 * 1024,
            queue_depth: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage_path: PathBuf,
    pub cors_origins: CorsOrigins,
    /// Static bearer tokens and the user each one authenticates as
    pub api_tokens: HashMap<String, Uuid>,
    pub stream: StreamSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment, or a map in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("QUILL_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("QUILL_BIND_ADDR is not a socket address")?;

        let storage_path = PathBuf::from(
            lookup("QUILL_STORAGE_PATH").unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string()),
        );

        let cors_origins = match lookup("QUILL_CORS_ORIGINS") {
            Some(origins) if origins.trim() == "*" => CorsOrigins::Any,
            Some(origins) => CorsOrigins::List(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            None => CorsOrigins::default(),
        };

        let api_tokens = match lookup("QUILL_API_TOKENS") {
            Some(tokens) => parse_tokens(&tokens)?,
            None => HashMap::new(),
        };

        let defaults = StreamSettings::default();
        let stream = StreamSettings {
            chunk_bytes: parse_positive(&lookup, "QUILL_STREAM_CHUNK_BYTES", defaults.chunk_bytes)?,
            queue_depth: parse_positive(&lookup, "QUILL_STREAM_QUEUE_DEPTH", defaults.queue_depth)?,
        };

        Ok(Self {
            bind_addr,
            storage_path,
            cors_origins,
            api_tokens,
            stream,
        })
    }
}

/// Parse `token=uuid` pairs separated by commas
pub fn parse_tokens(value: &str) -> Result<HashMap<String, Uuid>> {
    let mut tokens = HashMap::new();
    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((token, user)) = pair.split_once('=') else {
            bail!("QUILL_API_TOKENS entry is not token=uuid: {}", pair);
        };
        let user = Uuid::parse_str(user.trim())
            .with_context(|| format!("QUILL_API_TOKENS user id is not a UUID: {}", user))?;
        tokens.insert(token.trim().to_string(), user);
    }
    Ok(tokens)
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> Result<usize> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => {
            let value: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("{} is not a number", key))?;
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
            Ok(value)
        }
    }
}
