use std::path::Path;

use layers::ViewportConfig;
use overlay::OverlayConfig;
use serde::{Deserialize, Serialize};
use streaming::{ResilienceConfig, TilesetOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    pub saved_ms: u64,
    pub reset_ms: u64,
    pub info_ms: u64,
    pub error_ms: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            saved_ms: 2_000,
            reset_ms: 2_000,
            info_ms: 5_000,
            error_ms: 5_000,
        }
    }
}

/// Everything tunable about a viewer session. Missing sections and fields
/// take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub viewport: ViewportConfig,
    pub resilience: ResilienceConfig,
    pub tileset: TilesetOptions,
    pub overlay: OverlayConfig,
    pub notices: NoticeConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config read error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), "viewer config loaded");
        Ok(config)
    }

    /// Resilience settings starting from the tileset's screen-space error, so
    /// the tolerance the tileset loads with is the one the manager restores to.
    pub fn effective_resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            initial_tolerance: self.tileset.maximum_screen_space_error,
            ..self.resilience.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sse = self.tileset.maximum_screen_space_error;
        if !(sse.is_finite() && sse > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tileset maximumScreenSpaceError {sse} must be positive"
            )));
        }
        let r = &self.resilience;
        if !(r.min_tolerance > 0.0 && r.min_tolerance <= r.max_tolerance) {
            return Err(ConfigError::Invalid(format!(
                "tolerance bounds [{}, {}] are empty",
                r.min_tolerance, r.max_tolerance
            )));
        }
        if self.viewport.padding < 0.0 {
            return Err(ConfigError::Invalid("viewport padding is negative".to_string()));
        }
        let descending = self
            .viewport
            .tiers
            .windows(2)
            .all(|w| w[0].above_extent_deg > w[1].above_extent_deg);
        if !descending {
            return Err(ConfigError::Invalid(
                "altitude tiers must be in descending extent order".to_string(),
            ));
        }
        if self.overlay.storage_key.is_empty() {
            return Err(ConfigError::Invalid("overlay storage key is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ViewerConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(ViewerConfig::from_json_str("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{"resilience": {"initial_tolerance": 16}, "notices": {"info_ms": 8000}}"#,
        )
        .unwrap();
        assert_eq!(config.resilience.initial_tolerance, 16.0);
        assert_eq!(config.resilience.max_tolerance, 64.0);
        assert_eq!(config.notices.info_ms, 8_000);
        assert_eq!(config.notices.saved_ms, 2_000);
        assert_eq!(config.overlay.storage_key, "floorplanPosition");
    }

    #[test]
    fn tileset_error_seeds_resilience() {
        let config =
            ViewerConfig::from_json_str(r#"{"tileset": {"maximumScreenSpaceError": 16}}"#).unwrap();
        assert_eq!(config.tileset.maximum_screen_space_error, 16.0);
        let resilience = config.effective_resilience();
        assert_eq!(resilience.initial_tolerance, 16.0);
        assert_eq!(resilience.min_tolerance, config.resilience.min_tolerance);

        assert_eq!(ViewerConfig::default().effective_resilience().initial_tolerance, 32.0);
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{"tileset": {"maximumScreenSpaceError": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_inverted_bounds_and_bad_json() {
        let err = ViewerConfig::from_json_str(
            r#"{"resilience": {"min_tolerance": 80, "max_tolerance": 64}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(matches!(
            ViewerConfig::from_json_str("[1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{"viewport": {"fly_duration_s": 3.5}}"#).unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.viewport.fly_duration_s, 3.5);
        assert!(matches!(
            ViewerConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
