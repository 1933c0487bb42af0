use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_IMAGE_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub openrouter_api_key: String,
    pub llm_model: String,
    /// Company name printed in the default document footer.
    pub brand_company: String,
    /// Upper bound for a decoded uploaded document.
    pub max_document_bytes: usize,
    pub image_fetch_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let openrouter_api_key =
            get("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            openrouter_api_key,
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            brand_company: get("BRAND_COMPANY").unwrap_or(defaults.brand_company),
            max_document_bytes: parse_or(
                "MAX_DOCUMENT_BYTES",
                get("MAX_DOCUMENT_BYTES"),
                defaults.max_document_bytes,
            )?,
            image_fetch_timeout: Duration::from_secs(parse_or(
                "IMAGE_FETCH_TIMEOUT_SECS",
                get("IMAGE_FETCH_TIMEOUT_SECS"),
                DEFAULT_IMAGE_FETCH_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            openrouter_api_key: String::new(),
            llm_model: DEFAULT_MODEL.to_string(),
            brand_company: content_kit::Brand::default().company,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            image_fetch_timeout: Duration::from_secs(DEFAULT_IMAGE_FETCH_TIMEOUT_SECS),
        }
    }
}
