use crate::agents::guardrail::GuardrailMode;
use crate::error::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Upper bound for `llm.max_retries`; backoff doubles per attempt
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub guardrail: GuardrailConfig,
    pub tracing: TraceConfig,
    pub ingestion: IngestionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
    /// Deadline applied to every external capability call.
    pub request_timeout_ms: u64,
    /// Extra attempts for transient failures. Zero keeps "fail on first error".
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    pub vector_store_id: Option<String>,
    pub max_num_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    pub mode: GuardrailMode,
    /// Topic policy handed to the Query Validator.
    pub policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    pub workflow_name: String,
    pub include_sensitive_data: bool,
    pub store_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub default_file: String,
    pub store_name: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 60_000,
            max_retries: 0,
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            vector_store_id: None,
            max_num_results: 3,
        }
    }
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            mode: GuardrailMode::Blocking,
            policy: "Accept questions about business, technology, artificial intelligence, \
                     research, and anything covered by the documents in the knowledge base, \
                     including current events in those areas. Reject everything else, \
                     for example cooking and recipes, sports, celebrity gossip, or personal advice."
                .to_string(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            workflow_name: "Document and Web Information Assistant".to_string(),
            include_sensitive_data: true,
            store_dir: None,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            default_file: "test.pdf".to_string(),
            store_name: "document_knowledge_base".to_string(),
            poll_interval_ms: 2_000,
            max_polls: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings: built-in defaults, then `config/{CONFIG_ENV}`, then `APP__*`
    /// environment variables, then `VECTOR_STORE_ID`.
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "knowledge_base.vector_store_id",
                env::var("VECTOR_STORE_ID").ok().filter(|id| !id.is_empty()),
            )?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn api_key() -> Result<String, ConfigError> {
        env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if self.llm.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "llm.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.llm.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "llm.max_retries must be at most {}, got {}",
                MAX_RETRIES, self.llm.max_retries
            )));
        }
        if !(1..=50).contains(&self.knowledge_base.max_num_results) {
            return Err(ConfigError::Invalid(format!(
                "knowledge_base.max_num_results must be between 1 and 50, got {}",
                self.knowledge_base.max_num_results
            )));
        }
        if self.ingestion.max_polls == 0 {
            return Err(ConfigError::Invalid(
                "ingestion.max_polls must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The knowledge-base identifier the document specialist searches.
    pub fn vector_store_id(&self) -> Result<&str, ConfigError> {
        self.knowledge_base
            .vector_store_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingKnowledgeBase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.knowledge_base.max_num_results, 3);
        assert_eq!(settings.guardrail.mode, GuardrailMode::Blocking);
        assert_eq!(settings.llm.max_retries, 0);
    }

    #[test]
    fn test_defaults_survive_config_round_trip() {
        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default()).unwrap())
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();

        assert_eq!(settings.llm.base_url, DEFAULT_BASE_URL);
        assert!(settings.knowledge_base.vector_store_id.is_none());
        assert_eq!(settings.ingestion.store_name, "document_knowledge_base");
    }

    #[test]
    fn test_missing_vector_store_id() {
        let settings = Settings::default();
        assert!(matches!(
            settings.vector_store_id(),
            Err(ConfigError::MissingKnowledgeBase)
        ));

        let mut settings = Settings::default();
        settings.knowledge_base.vector_store_id = Some("vs_123".to_string());
        assert_eq!(settings.vector_store_id().unwrap(), "vs_123");
    }

    #[test]
    fn test_rejects_unbounded_retries() {
        let mut settings = Settings::default();
        settings.llm.max_retries = MAX_RETRIES;
        assert!(settings.validate().is_ok());

        settings.llm.max_retries = 64;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_out_of_range_result_count() {
        let mut settings = Settings::default();
        settings.knowledge_base.max_num_results = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }
}
