//! Configuration types for the portfolio assistant.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration the
//! session manager and chat view are built from.

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::persona;
use crate::types::Model;

/// Environment variable holding the API key unless configured otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

/// Command-line arguments for the portfolio-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature, parsed when the config is built.
    #[arrrg(optional, "Sampling temperature 0.0-2.0 (default: 0.8)", "TEMP")]
    pub temperature: Option<String>,

    /// Environment variable to read the API key from.
    #[arrrg(optional, "Environment variable holding the API key (default: API_KEY)", "VAR")]
    pub api_key_env: Option<String>,

    /// Alternate API root.
    #[arrrg(optional, "API base URL (default: Generative Language API v1beta)", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for the assistant.
///
/// The session-shaping fields (`model`, `system_instruction`, `temperature`) are read once,
/// when the session is created, and stay fixed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// System instruction the session is created with.
    pub system_instruction: String,

    /// Sampling temperature the session is created with.
    pub temperature: f32,

    /// Explicit API key.  Takes precedence over the environment.
    pub api_key: Option<String>,

    /// Environment variable consulted for the API key at session creation.
    pub api_key_env: String,

    /// Alternate API root; `None` uses the public endpoint.
    pub base_url: Option<String>,

    /// Message the chat view is seeded with.
    pub greeting: String,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl AssistantConfig {
    /// Creates a new AssistantConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - Temperature: 0.8
    /// - API key: read from `API_KEY`
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: persona::SYSTEM_INSTRUCTION.to_string(),
            temperature: persona::TEMPERATURE,
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: None,
            greeting: persona::GREETING.to_string(),
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets an explicit API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the environment variable consulted for the API key.
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for AssistantConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let defaults = AssistantConfig::new();
        let model = args
            .model
            .and_then(|s| s.parse::<Model>().ok())
            .unwrap_or(defaults.model.clone());
        let temperature = match args.temperature {
            Some(value) => parse_temperature(&value)?,
            None => defaults.temperature,
        };

        Ok(AssistantConfig {
            model,
            temperature,
            api_key_env: args.api_key_env.unwrap_or(defaults.api_key_env.clone()),
            base_url: args.base_url,
            use_color: !args.no_color,
            ..defaults
        })
    }
}

fn parse_temperature(value: &str) -> Result<f32> {
    match value.trim().parse::<f32>() {
        Ok(parsed) if (0.0..=2.0).contains(&parsed) => Ok(parsed),
        Ok(_) => Err(Error::configuration(format!(
            "--temperature must be between 0.0 and 2.0, got {value}"
        ))),
        Err(_) => Err(Error::configuration(format!(
            "--temperature expects a number, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = AssistantConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(config.temperature, 0.8);
        assert_eq!(config.api_key_env, "API_KEY");
        assert!(config.api_key.is_none());
        assert!(config.base_url.is_none());
        assert!(config.system_instruction.contains("You are 'Aiden'"));
        assert_eq!(config.greeting, persona::GREETING);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = AssistantConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, AssistantConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            temperature: Some("0.2".to_string()),
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            base_url: Some("http://localhost:8080/v1beta/".to_string()),
            no_color: true,
        };
        let config = AssistantConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.api_key_env, "GEMINI_API_KEY");
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://localhost:8080/v1beta/")
        );
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_rejects_bad_temperature() {
        for value in ["warm", "", "2.5", "-0.1"] {
            let args = ChatArgs {
                temperature: Some(value.to_string()),
                ..ChatArgs::default()
            };
            let err = AssistantConfig::try_from(args).unwrap_err();
            assert!(err.is_configuration(), "{value:?} accepted");
            assert!(err.to_string().contains("--temperature"));
        }
    }

    #[test]
    fn config_builder_pattern() {
        let config = AssistantConfig::new()
            .with_model(Model::Custom("gemini-exp-1206".to_string()))
            .with_system_instruction("Be brief.")
            .with_temperature(0.5)
            .with_api_key("k")
            .with_api_key_env("OTHER_KEY")
            .with_base_url("http://localhost/")
            .with_greeting("Hi!")
            .without_color();

        assert_eq!(config.model, Model::Custom("gemini-exp-1206".to_string()));
        assert_eq!(config.system_instruction, "Be brief.");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.api_key_env, "OTHER_KEY");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost/"));
        assert_eq!(config.greeting, "Hi!");
        assert!(!config.use_color);
    }
}
