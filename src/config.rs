use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Presentation and transport settings shared by the planner and wrappers.
///
/// Every key is optional in TOML; missing keys keep their defaults.
///
/// ```
/// use snippet_injector::EngineConfig;
///
/// let config = EngineConfig::from_toml("class_prefix = \"promo\"").unwrap();
/// assert_eq!(config.class_prefix, "promo");
/// assert_eq!(config.payload_global, "sdiPayloads");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Class stem for alignment wrappers; the alignment name is appended.
    pub class_prefix: String,
    /// Margin left beside a floated wrapper.
    pub float_gutter: String,
    /// Name of the global array the transport script assigns.
    pub payload_global: String,
    /// URL of the `wasm-bindgen` module exporting `injectPayloads`. When
    /// set, pages also get a module script that runs the injector.
    pub runtime_module: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            class_prefix: "sdi-align".to_owned(),
            float_gutter: "15px".to_owned(),
            payload_global: "sdiPayloads".to_owned(),
            runtime_module: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or an invalid value.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O, TOML or validation failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml(&input)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let global = &self.payload_global;
        let valid_ident = global
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && global
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if !valid_ident {
            return Err(ConfigError::Invalid {
                key: "payload_global",
                reason: format!("'{global}' is not a javascript identifier"),
            });
        }
        if self.class_prefix.chars().any(|c| c.is_whitespace() || c == '"') {
            return Err(ConfigError::Invalid {
                key: "class_prefix",
                reason: "must be a single class name".to_owned(),
            });
        }
        if let Some(url) = &self.runtime_module {
            let unquotable = |c: char| matches!(c, '"' | '\\' | '<' | '>') || c.is_control();
            if url.is_empty() || url.chars().any(unquotable) {
                return Err(ConfigError::Invalid {
                    key: "runtime_module",
                    reason: format!("'{url}' cannot be quoted as a module url"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config = EngineConfig::from_toml(
            r#"
float_gutter = "1em"
payload_global = "myPayloads"
"#,
        )
        .unwrap();
        assert_eq!(config.float_gutter, "1em");
        assert_eq!(config.payload_global, "myPayloads");
        assert_eq!(config.class_prefix, "sdi-align");
    }

    #[test]
    fn rejects_bad_global() {
        let err = EngineConfig::from_toml("payload_global = \"1-bad\"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for 'payload_global': '1-bad' is not a javascript identifier"
        );
    }

    #[test]
    fn rejects_spaced_prefix() {
        let err = EngineConfig::from_toml("class_prefix = \"a b\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "class_prefix", .. }));
    }

    #[test]
    fn runtime_module_is_optional() {
        assert_eq!(EngineConfig::default().runtime_module, None);
        let config =
            EngineConfig::from_toml("runtime_module = \"/assets/snippet_injector.js\"").unwrap();
        assert_eq!(config.runtime_module.as_deref(), Some("/assets/snippet_injector.js"));
    }

    #[test]
    fn rejects_unquotable_module() {
        let err = EngineConfig::from_toml(r#"runtime_module = "a\"b""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "runtime_module", .. }));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(
            EngineConfig::from_toml("class_prefix = "),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/sdi.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
