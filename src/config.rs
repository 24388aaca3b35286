use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Error, Result};

pub const DEFAULT_LLM_BASE_URL: &str = "https://foundation-models.api.cloud.ru/v1";
pub const DEFAULT_GEN_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_UI_BASE_URL: &str = "https://cloud.ru/calculator";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub gen_model: String,
    /// Falls back to `gen_model` when unset.
    #[serde(default)]
    pub review_model: Option<String>,
    /// Seconds per provider call.
    pub timeout: u64,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn review_model(&self) -> &str {
        self.review_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.gen_model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub ui_base_url: String,
    #[serde(default)]
    pub feature: Option<String>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub max_refine_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: DEFAULT_LLM_BASE_URL.to_string(),
                gen_model: DEFAULT_GEN_MODEL.to_string(),
                review_model: None,
                timeout: 60,
                max_tokens: 2000,
            },
            generation: GenerationConfig {
                ui_base_url: DEFAULT_UI_BASE_URL.to_string(),
                feature: None,
                output_dir: PathBuf::from("generated"),
                concurrency: 1,
                max_refine_attempts: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        config_path_under(dirs::home_dir())
    }

    /// Defaults, then `~/.qagen/config.yml`, then `./qagen.*`, then
    /// `QAGEN__SECTION__KEY` variables, then the legacy variable names.
    pub fn load() -> Result<Self> {
        let mut builder = Self::builder_with_defaults()?;
        if let Ok(home_config) = Self::config_path() {
            builder = builder.add_source(File::from(home_config).required(false));
        }
        builder = builder.add_source(File::with_name("qagen").required(false));
        Self::finish(builder)
    }

    /// Like [`Config::load`] but reads only the given file besides the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Self::builder_with_defaults()?.add_source(File::from(path.to_path_buf()));
        Self::finish(builder)
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        let defaults = Config::default();
        let builder = config::Config::builder()
            .set_default("llm.base_url", defaults.llm.base_url)?
            .set_default("llm.gen_model", defaults.llm.gen_model)?
            .set_default("llm.timeout", defaults.llm.timeout as i64)?
            .set_default("llm.max_tokens", defaults.llm.max_tokens as i64)?
            .set_default("generation.ui_base_url", defaults.generation.ui_base_url)?
            .set_default(
                "generation.output_dir",
                defaults.generation.output_dir.to_string_lossy().to_string(),
            )?
            .set_default("generation.concurrency", defaults.generation.concurrency as i64)?
            .set_default(
                "generation.max_refine_attempts",
                defaults.generation.max_refine_attempts as i64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?;
        Ok(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let mut config: Config = builder
            .add_source(
                Environment::with_prefix("QAGEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.apply_legacy_env();
        Ok(config)
    }

    // Variable names older deployment scripts export.
    fn apply_legacy_env(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("API_KEY")
                .or_else(|_| std::env::var("EVOLUTION_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        if let Ok(model) = std::env::var("EVOLUTION_GEN_MODEL") {
            if !model.trim().is_empty() {
                self.llm.gen_model = model;
            }
        }
        if self.llm.review_model.is_none() {
            self.llm.review_model = std::env::var("EVOLUTION_REVIEW_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty());
        }
    }

    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(&config_path, content).await?;

        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.llm.api_key = Some(api_key);
    }

    pub fn set_model(&mut self, model: String) {
        self.llm.gen_model = model;
    }

    pub fn set_review_model(&mut self, model: String) {
        self.llm.review_model = Some(model);
    }

    pub fn is_ai_configured(&self) -> bool {
        self.llm.api_key.as_deref().map_or(false, |k| !k.is_empty())
            && !self.llm.gen_model.is_empty()
    }

    pub fn validate_all_settings(&self) -> ValidationResult {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        match self.llm.api_key.as_deref() {
            None => issues.push("API key is required for generation".to_string()),
            Some(key) if key.is_empty() => issues.push("API key is empty".to_string()),
            Some(key) if key.len() < 10 => warnings.push("API key seems too short".to_string()),
            Some(_) => {}
        }

        if self.llm.gen_model.is_empty() {
            issues.push("Generation model name is required".to_string());
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            issues.push(format!("LLM base URL is not an http(s) URL: {}", self.llm.base_url));
        }

        if self.llm.timeout == 0 {
            warnings.push("Timeout is set to 0, which may cause immediate timeouts".to_string());
        } else if self.llm.timeout > 300 {
            warnings.push("Timeout is very high (>5 minutes), consider reducing it".to_string());
        }

        if self.generation.concurrency == 0 {
            issues.push("Concurrency must be at least 1".to_string());
        }

        if self.generation.max_refine_attempts == 0 {
            warnings.push("max_refine_attempts is 0, failing tests will never be rewritten".to_string());
        } else if self.generation.max_refine_attempts > 3 {
            warnings.push("More than 3 refine attempts per test multiplies LLM cost".to_string());
        }

        ValidationResult {
            is_valid: issues.is_empty(),
            issues,
            warnings,
        }
    }
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

fn config_path_under(home: Option<PathBuf>) -> Result<PathBuf> {
    let home = home.ok_or_else(|| {
        Error::Config(config::ConfigError::Message(
            "could not find home directory for ~/.qagen/config.yml".to_string(),
        ))
    })?;
    Ok(home.join(".qagen").join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_home_is_a_config_error() {
        let err = config_path_under(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_fatal());

        let path = config_path_under(Some(PathBuf::from("/home/qa"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/qa/.qagen/config.yml"));
    }

    #[test]
    fn test_review_model_falls_back_to_gen_model() {
        let mut config = Config::default();
        assert_eq!(config.llm.review_model(), DEFAULT_GEN_MODEL);
        config.set_review_model("reviewer".to_string());
        assert_eq!(config.llm.review_model(), "reviewer");
    }

    #[test]
    fn test_validation_flags_missing_key() {
        let mut config = Config::default();
        config.llm.api_key = None;
        let result = config.validate_all_settings();
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.contains("API key")));
    }

    #[test]
    fn test_validation_accepts_complete_config() {
        let mut config = Config::default();
        config.set_api_key("0123456789abcdef".to_string());
        let result = config.validate_all_settings();
        assert!(result.is_valid, "{:?}", result.issues);
    }
}
