//! Service configuration loaded once at startup

use std::env;
use std::fmt;

use thiserror::Error;

const DEFAULT_REGION: &str = "nl-ams";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOKENS_TABLE: &str = "pickup-tokens";
const DEFAULT_RESOURCES_TABLE: &str = "pickup-resources";
const DEFAULT_COUNTERS_TABLE: &str = "pickup-counters";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors raised while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Missing env property: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Immutable service configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Shared secret required to issue upload tokens
    pub root_secret: String,
    /// Bucket every object is written into
    pub bucket: String,
    /// Object storage region
    pub region: String,
    /// Object storage access key
    pub access_key: String,
    /// Object storage secret key
    pub secret_key: String,
    /// HTTP listening port
    pub port: u16,
    /// Dynamo DB table for tokens
    pub tokens_table_name: String,
    /// Dynamo DB table for resources
    pub resources_table_name: String,
    /// Dynamo DB table for id counters
    pub counters_table_name: String,
    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
    /// Whether a token may be committed more than once before it expires
    pub allow_token_reuse: bool,
}

impl Config {
    /// Reads configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let root_secret = required("ROOT_SECRET")?;
        let bucket = required("BUCKET")?;
        let secret_key = required("SECRET_KEY")?;
        let access_key = required("ACCESS_KEY")?;

        let port = match var("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_UPLOAD_BYTES",
                value,
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let allow_token_reuse = match var("ALLOW_TOKEN_REUSE") {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "ALLOW_TOKEN_REUSE",
                        value,
                    })
                }
            },
            None => false,
        };

        Ok(Self {
            root_secret,
            bucket,
            region: var("REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key,
            secret_key,
            port,
            tokens_table_name: var("TOKENS_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_TOKENS_TABLE.to_string()),
            resources_table_name: var("RESOURCES_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_RESOURCES_TABLE.to_string()),
            counters_table_name: var("COUNTERS_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_COUNTERS_TABLE.to_string()),
            max_upload_bytes,
            allow_token_reuse,
        })
    }

    /// Object storage endpoint for the configured region
    #[must_use]
    pub fn storage_endpoint(&self) -> String {
        format!("https://s3.{}.scw.cloud", self.region)
    }

    /// Public URL under which an uploaded object is served
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.scw.cloud/{key}", self.bucket, self.region)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("port", &self.port)
            .field("tokens_table_name", &self.tokens_table_name)
            .field("resources_table_name", &self.resources_table_name)
            .field("counters_table_name", &self.counters_table_name)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allow_token_reuse", &self.allow_token_reuse)
            .finish()
    }
}
