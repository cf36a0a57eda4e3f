//! Scene and engine configuration.
//!
//! Both are plain serde structs with defaults, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::SceneError;

// ---------------------------------------------------------------------------
// SceneConfig
// ---------------------------------------------------------------------------

/// Which systems a scene runs, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub name: String,
    pub systems: Vec<SystemConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }
}

impl SceneConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, name: impl Into<String>) -> Self {
        self.systems.push(SystemConfig::new(name));
        self
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Frame driver settings for [`SceneManager`](crate::manager::SceneManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds per scene update. Must be positive and finite.
    pub fixed_dt: f64,
    /// Most updates run for one call to `SceneManager::update`; leftover
    /// time is dropped.
    pub max_steps_per_update: u32,
}

impl Default for EngineConfig {
    /// 60 Hz, at most 8 catch-up steps.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_steps_per_update: 8,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SceneError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(SceneError::InvalidConfig {
                details: format!("fixed_dt must be positive and finite, got {}", self.fixed_dt),
            });
        }
        if self.max_steps_per_update == 0 {
            return Err(SceneError::InvalidConfig {
                details: "max_steps_per_update must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_config_from_json() {
        let config = SceneConfig::from_json(
            r#"{ "name": "Level1", "systems": [ { "name": "Animation" }, { "name": "Audio", "enabled": false } ] }"#,
        )
        .unwrap();
        assert_eq!(config.name, "Level1");
        assert_eq!(config.systems[0], SystemConfig::new("Animation"));
        assert!(!config.systems[1].enabled);

        assert_eq!(SceneConfig::from_json("{}").unwrap(), SceneConfig::default());
        assert!(matches!(SceneConfig::from_json("[1]"), Err(SceneError::Config(_))));
    }

    #[test]
    fn engine_config_is_validated() {
        assert!(EngineConfig::default().validate().is_ok());
        assert_eq!(EngineConfig::from_json(r#"{ "fixed_dt": 0.01 }"#).unwrap().max_steps_per_update, 8);
        assert!(matches!(
            EngineConfig::from_json(r#"{ "fixed_dt": 0.0 }"#),
            Err(SceneError::InvalidConfig { .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "max_steps_per_update": 0 }"#),
            Err(SceneError::InvalidConfig { .. })
        ));
    }
}
