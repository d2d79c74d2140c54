use crate::error::{InferenceError, Result};
use crate::http::{HttpInference, HttpInferenceConfig};
use crate::service::InferenceService;
use crate::stub::StubInference;
use std::env;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InferenceMode {
    Http,
    Stub,
}

impl InferenceMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stub" => Ok(Self::Stub),
            other => Err(InferenceError::config(format!(
                "Unsupported DOCTREE_INFERENCE_MODE '{other}' (expected 'http' or 'stub')"
            ))),
        }
    }

    pub fn from_env() -> Result<Self> {
        let raw = env::var("DOCTREE_INFERENCE_MODE").unwrap_or_else(|_| "http".to_string());
        Self::parse(&raw)
    }

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Stub => "stub",
        }
    }
}

pub fn current_inference_mode_id() -> Result<&'static str> {
    Ok(InferenceMode::from_env()?.id())
}

/// Build the backend selected by `mode`; `dimension` sizes stub vectors and is
/// forwarded to the HTTP backend unless `DOCTREE_EMBEDDING_DIMENSIONS` is set.
pub fn service_from_env(
    mode: Option<InferenceMode>,
    dimension: usize,
) -> Result<Arc<dyn InferenceService>> {
    let mode = match mode {
        Some(mode) => mode,
        None => InferenceMode::from_env()?,
    };
    log::info!("Using {} inference backend", mode.id());
    match mode {
        InferenceMode::Stub => Ok(Arc::new(StubInference::new(dimension))),
        InferenceMode::Http => {
            let mut config = HttpInferenceConfig::from_env();
            config.dimensions.get_or_insert(dimension);
            Ok(Arc::new(HttpInference::new(config)?))
        }
    }
}
