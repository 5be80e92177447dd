use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub palette: Palette,
    pub animation: AnimationConfig,
    /// Module loaded when the runtime starts.
    pub start_module: String,
    /// Seed for the value generators. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            animation: AnimationConfig::default(),
            start_module: "tutorial".to_string(),
            seed: None,
        }
    }
}

impl ArcadeConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Named colors shared by every module, stored as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: u32,
    pub success: u32,
    pub error: u32,
    pub warning: u32,
    pub base: u32,
    pub highlight: u32,
    pub neutral: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: 0x38bdf8,
            success: 0x10b981,
            error: 0xef4444,
            warning: 0xf59e0b,
            base: 0x1e293b,
            highlight: 0xfacc15,
            neutral: 0xffffff,
        }
    }
}

/// Configuration specific to step pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Initial global speed factor.
    pub speed: f64,
    /// Frame length used by movement animations, in milliseconds.
    pub frame_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            frame_ms: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ArcadeConfig::from_json(r#"{ "animation": { "speed": 2.5 }, "seed": 7 }"#)
            .expect("config should parse");

        assert_eq!(config.animation.speed, 2.5);
        assert_eq!(config.animation.frame_ms, 16);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.palette, Palette::default());
        assert_eq!(config.start_module, "tutorial");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ArcadeConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::ArcadeError::Json(_)));
    }
}
