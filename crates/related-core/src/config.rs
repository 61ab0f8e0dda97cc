//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_RELATED__K=3`). Typed settings for a run
//! live under the `related` and `embedding` tables; every field has a default
//! so an empty configuration is valid.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str { &self.env_name }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Like [`Config::get`] but a missing table falls back to `T::default()`.
    fn section<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.get(key)
    }

    pub fn run_settings(&self) -> Result<RunSettings> {
        let settings: RunSettings = self.section("related")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Embedding settings, with `APP_USE_FAKE_EMBEDDINGS=1` forcing `fake`.
    pub fn embedding_settings(&self) -> Result<EmbeddingSettings> {
        let mut settings: EmbeddingSettings = self.section("embedding")?;
        settings.fake |= env::var("APP_USE_FAKE_EMBEDDINGS")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        Ok(settings)
    }

    /// Reject embedding settings the current environment does not allow.
    /// Call again after applying overrides from outside the config layers.
    pub fn check_embedding(&self, settings: &EmbeddingSettings) -> Result<()> {
        if matches!(self.env_name.as_str(), "prod" | "production") && settings.fake {
            return Err(Error::InvalidConfig(
                "fake embeddings are not allowed in production".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_for_env(&self) -> Result<()> {
        self.check_embedding(&self.embedding_settings()?)
    }
}

/// Knobs for one ranking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Neighbor-list length.
    pub k: usize,
    pub input_path: String,
    pub output_path: String,
    /// Documents ranked concurrently.
    pub workers: usize,
    /// Embedder calls allowed in flight at once.
    pub embed_concurrency: usize,
    pub batch_size: usize,
    pub embed_timeout_secs: u64,
    /// Extra attempts per text after its batch failed.
    pub max_embed_retries: u32,
    /// Consecutive per-text failures after which the embedder is declared unavailable.
    pub unavailable_after: u32,
    pub deadline_secs: Option<u64>,
    pub progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            k: 5,
            input_path: "input.json".to_string(),
            output_path: "output.txt".to_string(),
            workers: std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            embed_concurrency: 1,
            batch_size: 32,
            embed_timeout_secs: 30,
            max_embed_retries: 2,
            unavailable_after: 8,
            deadline_secs: None,
            progress: false,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("workers", self.workers as u64),
            ("embed_concurrency", self.embed_concurrency as u64),
            ("batch_size", self.batch_size as u64),
            ("embed_timeout_secs", self.embed_timeout_secs),
            ("unavailable_after", u64::from(self.unavailable_after)),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("related.{} must be positive", name)));
            }
        }
        if self.deadline_secs == Some(0) {
            return Err(Error::InvalidConfig("related.deadline_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn input_path(&self) -> PathBuf { expand_path(&self.input_path) }
    pub fn output_path(&self) -> PathBuf { expand_path(&self.output_path) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub max_len: usize,
    /// Use the hashing embedder instead of loading a model.
    pub fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, max_len: 128, fake: false, fake_dim: 768 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
