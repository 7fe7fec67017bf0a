//! Bridge configuration (`ferry.toml`).

use crate::error::BridgeError;
use ferry_diagnostics::{DiagnosticChannel, JsonEmitter, SimpleEmitter, TerminalEmitter, DEFAULT_HISTORY};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the event-dispatch function looked up on emitters.
pub const DEFAULT_EMIT_FUNCTION: &str = "emit";

/// Name of the context-propagation method.
pub const DEFAULT_WINDOW_METHOD: &str = "setWindow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Function an emitter must expose for events to be dispatched
    pub emit_function: String,
    /// Method receiving propagated window/context objects
    pub window_method: String,
    /// Assert (in debug builds) that calls arrive on the owning thread
    pub check_thread: bool,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            emit_function: DEFAULT_EMIT_FUNCTION.to_string(),
            window_method: DEFAULT_WINDOW_METHOD.to_string(),
            check_thread: cfg!(debug_assertions),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub format: PresentationFormat,
    pub color: bool,
    /// Diagnostics kept for the summary; older ones are dropped
    pub history: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            format: PresentationFormat::Terminal,
            color: true,
            history: DEFAULT_HISTORY,
        }
    }
}

/// How caught script exceptions are presented to the developer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationFormat {
    Terminal,
    Json,
    Simple,
    /// Report and record only
    Silent,
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded bridge config from {}", path.display());
        Ok(config)
    }

    /// Diagnostic channel presenting to stderr in the configured format.
    pub fn channel(&self) -> DiagnosticChannel {
        let stderr = std::io::stderr();
        let channel = match self.diagnostics.format {
            PresentationFormat::Terminal => {
                DiagnosticChannel::new(Box::new(TerminalEmitter::new(stderr, self.diagnostics.color)))
            }
            PresentationFormat::Json => DiagnosticChannel::new(Box::new(JsonEmitter::new(stderr))),
            PresentationFormat::Simple => DiagnosticChannel::new(Box::new(SimpleEmitter::new(stderr))),
            PresentationFormat::Silent => DiagnosticChannel::silent(),
        };
        channel.with_history(self.diagnostics.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.emit_function, "emit");
        assert_eq!(config.window_method, "setWindow");
        assert_eq!(config.diagnostics.history, DEFAULT_HISTORY);
    }

    #[test]
    fn test_partial_override() {
        let config = BridgeConfig::from_toml_str(
            r#"
emit_function = "fireEvent"

[diagnostics]
format = "json"
history = 16
"#,
        )
        .unwrap();
        assert_eq!(config.emit_function, "fireEvent");
        assert_eq!(config.window_method, "setWindow");
        assert_eq!(config.diagnostics.format, PresentationFormat::Json);
        assert_eq!(config.diagnostics.history, 16);
        assert!(config.diagnostics.color);
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        let err = BridgeConfig::from_toml_str("[diagnostics]\nformat = \"dialog\"\n").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::load("/definitely/not/here/ferry.toml").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigIo { .. }));
    }
}
