use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Validation failures for out-of-range settings. These are rejected before
/// any processing starts; values are never silently clamped.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("dedup_threshold must be between 0 and 64 bits, got {0}")]
    DedupThreshold(u32),

    #[error("top_n must be at least 1, got {0}")]
    TopN(usize),

    #[error("similarity_threshold must be within [0, 1], got {0}")]
    SimilarityThreshold(f64),

    #[error("lambda_penalty must be a finite value >= 0, got {0}")]
    LambdaPenalty(f64),

    #[error("{name} must be a finite value >= 0, got {value}")]
    Weight { name: &'static str, value: f64 },

    #[error("embedding_model_name must not be empty")]
    EmptyModelName,
}

/// Ordering policy for the clustering pass. The clustering result depends on
/// iteration order, so the order is an explicit setting rather than whatever
/// the photos table happens to return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupOrder {
    #[default]
    PhotoId,
    QualityDesc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_thumbs_dir")]
    pub thumbs_dir: PathBuf,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub default_roots: Vec<PathBuf>,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    #[serde(default = "default_max_image_size")]
    pub max_image_size: u32,

    /// Key selecting which embedding rows the selector reads.
    #[serde(default = "default_embedding_model_name")]
    pub embedding_model_name: String,

    /// Hamming distance threshold for perceptual-duplicate grouping, out of
    /// 64 hash bits.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: u32,

    #[serde(default)]
    pub dedup_order: DedupOrder,

    /// When true, non-representative cluster members are removed from the
    /// selection candidate pool. Off by default: cluster results are
    /// informational unless the caller opts in.
    #[serde(default)]
    pub exclude_duplicates: bool,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_lambda_penalty")]
    pub lambda_penalty: f64,

    #[serde(default = "default_weights_technical")]
    pub weights_technical: f64,

    #[serde(default = "default_weights_aesthetic")]
    pub weights_aesthetic: f64,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-curator")
        .join("curator.db")
}

fn default_thumbs_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("photo-curator/thumbs")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-curator/logs")
}

fn default_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "webp".to_string(),
    ]
}

fn default_thumbnail_size() -> u32 {
    512
}

fn default_max_image_size() -> u32 {
    1024
}

fn default_embedding_model_name() -> String {
    "ViT-B-32".to_string()
}

fn default_dedup_threshold() -> u32 {
    6
}

fn default_top_n() -> usize {
    100
}

fn default_similarity_threshold() -> f64 {
    0.88
}

fn default_lambda_penalty() -> f64 {
    0.15
}

fn default_weights_technical() -> f64 {
    0.4
}

fn default_weights_aesthetic() -> f64 {
    0.6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            thumbs_dir: default_thumbs_dir(),
            report_dir: default_report_dir(),
            log_dir: default_log_dir(),
            default_roots: Vec::new(),
            extensions: default_extensions(),
            thumbnail_size: default_thumbnail_size(),
            max_image_size: default_max_image_size(),
            embedding_model_name: default_embedding_model_name(),
            dedup_threshold: default_dedup_threshold(),
            dedup_order: DedupOrder::default(),
            exclude_duplicates: false,
            top_n: default_top_n(),
            similarity_threshold: default_similarity_threshold(),
            lambda_penalty: default_lambda_penalty(),
            weights_technical: default_weights_technical(),
            weights_aesthetic: default_weights_aesthetic(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Settings::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photo-curator")
            .join("config.toml")
    }

    /// Reject out-of-range values before any pass starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dedup_threshold > 64 {
            return Err(ConfigError::DedupThreshold(self.dedup_threshold));
        }
        if self.top_n == 0 {
            return Err(ConfigError::TopN(self.top_n));
        }
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(ConfigError::SimilarityThreshold(self.similarity_threshold));
        }
        if !self.lambda_penalty.is_finite() || self.lambda_penalty < 0.0 {
            return Err(ConfigError::LambdaPenalty(self.lambda_penalty));
        }
        if !self.weights_technical.is_finite() || self.weights_technical < 0.0 {
            return Err(ConfigError::Weight {
                name: "weights_technical",
                value: self.weights_technical,
            });
        }
        if !self.weights_aesthetic.is_finite() || self.weights_aesthetic < 0.0 {
            return Err(ConfigError::Weight {
                name: "weights_aesthetic",
                value: self.weights_aesthetic,
            });
        }
        if self.embedding_model_name.is_empty() {
            return Err(ConfigError::EmptyModelName);
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.thumbs_dir)?;
        std::fs::create_dir_all(&self.report_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.dedup_threshold, 6);
        assert_eq!(settings.top_n, 100);
        assert_eq!(settings.similarity_threshold, 0.88);
        assert_eq!(settings.lambda_penalty, 0.15);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let settings = Settings {
            dedup_threshold: 65,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::DedupThreshold(65))
        ));
    }

    #[test]
    fn rejects_bad_similarity_threshold() {
        let settings = Settings {
            similarity_threshold: 1.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            similarity_threshold: f64::NAN,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_negative_lambda() {
        let settings = Settings {
            lambda_penalty: -0.1,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_top_n() {
        let settings = Settings {
            top_n: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::TopN(0))));
    }

    #[test]
    fn parses_partial_toml() {
        let settings: Settings =
            toml::from_str("dedup_threshold = 10\ndedup_order = \"quality_desc\"").unwrap();
        assert_eq!(settings.dedup_threshold, 10);
        assert_eq!(settings.dedup_order, DedupOrder::QualityDesc);
        assert_eq!(settings.top_n, 100);
    }
}
