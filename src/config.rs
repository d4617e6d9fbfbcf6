//! Recognised configuration options (§6), loaded from an optional TOML file
//! overlaid with environment variables — file → env → built-in default.
//!
//! There is no module-level singleton here: `Settings` is a plain value
//! constructed once and threaded into `Runtime::new` (§9).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

fn default_environment() -> String {
    "dev".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: String,
    pub log_level: String,
    pub debug: bool,

    pub complexity_threshold_simple: f64,
    pub complexity_threshold_complex: f64,
    pub timeout_seconds: u64,
    pub max_iterations_agentic: u32,

    pub l1_max_size: usize,
    pub l1_ttl: i64,
    pub l2_similarity_threshold: f64,
    pub l2_max_size: usize,
    pub l2_ttl: i64,
    pub l3_max_paths: usize,
    pub l3_ttl: i64,

    pub vector_size: usize,
    pub collection_name: String,

    pub enable_self_reflection: bool,
    pub parallel_agents: bool,
    pub confidence_threshold: f64,

    pub max_query_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            debug: false,

            complexity_threshold_simple: 0.3,
            complexity_threshold_complex: 0.7,
            timeout_seconds: 30,
            max_iterations_agentic: 5,

            l1_max_size: 100,
            l1_ttl: 3600,
            l2_similarity_threshold: 0.95,
            l2_max_size: 500,
            l2_ttl: 7200,
            l3_max_paths: 100,
            l3_ttl: 86400,

            vector_size: 1536,
            collection_name: "documents".to_string(),

            enable_self_reflection: false,
            parallel_agents: true,
            confidence_threshold: 0.8,

            max_query_len: 8192,
        }
    }
}

impl Settings {
    /// Load from a TOML file, if present, then overlay recognised
    /// environment variables (`HYBRID_FABRIC_<FIELD>`), then fill anything
    /// unset with defaults. A missing file is not an error; a malformed one
    /// is.
    pub fn load(toml_path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = match toml_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
                toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?
            }
            _ => Settings::default(),
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HYBRID_FABRIC_ENVIRONMENT") {
            self.environment = v;
        }
        if let Ok(v) = std::env::var("HYBRID_FABRIC_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("HYBRID_FABRIC_DEBUG") {
            if let Ok(parsed) = v.parse() {
                self.debug = parsed;
            }
        }
        if let Ok(v) = std::env::var("HYBRID_FABRIC_TIMEOUT_SECONDS") {
            if let Ok(parsed) = v.parse() {
                self.timeout_seconds = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6() {
        let settings = Settings::default();
        assert_eq!(settings.complexity_threshold_simple, 0.3);
        assert_eq!(settings.complexity_threshold_complex, 0.7);
        assert_eq!(settings.timeout_seconds, 30);
        assert_eq!(settings.max_iterations_agentic, 5);
        assert_eq!(settings.l1_max_size, 100);
        assert_eq!(settings.l2_similarity_threshold, 0.95);
        assert_eq!(settings.l3_ttl, 86400);
        assert_eq!(settings.vector_size, 1536);
        assert_eq!(settings.confidence_threshold, 0.8);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load(Some(Path::new("/nonexistent/path.toml"))).unwrap();
        assert_eq!(settings.timeout_seconds, 30);
    }
}
