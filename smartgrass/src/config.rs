//! Settings file support.
//!
//! Settings are read from a TOML file; every section and key is optional
//! and falls back to the built-in defaults. A few secrets and endpoints can
//! be overridden from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::analysis::pipeline::PipelineSettings;
use crate::collect::global_variables::{
    AREA_PER_POINT_HA, MAX_SAMPLE_POINTS, SAMPLE_SCALE_M, TEMP_PATH, TOLL_ROAD_URL,
};
use crate::collect::imagery::imagery_collect::ImageryCredentials;
use crate::collect::toll::toll_collect::DatasetSource;

pub const ENV_IMAGERY_TOKEN: &str = "SMARTGRASS_IMAGERY_TOKEN";
pub const ENV_IMAGERY_ENDPOINT: &str = "SMARTGRASS_IMAGERY_ENDPOINT";
pub const ENV_DATASET_URL: &str = "SMARTGRASS_DATASET_URL";

/// Locations searched when no path is given, in order
pub const DEFAULT_LOCATIONS: [&str; 2] = ["smartgrass.toml", "config/smartgrass.toml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub imagery: ImagerySettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

/// Toll-road reference dataset. A local `path` wins over `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_dataset_url")]
    pub url: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        DatasetSettings {
            url: default_dataset_url(),
            path: None,
            cache_dir: default_cache_dir(),
        }
    }
}

/// Remote imagery query service, or a canned response for offline runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagerySettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub fixture: Option<PathBuf>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    /// Request timeout; none when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_per_point_area_ha")]
    pub per_point_area_ha: f64,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default = "default_scale_m")]
    pub scale_m: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            per_point_area_ha: default_per_point_area_ha(),
            max_points: default_max_points(),
            scale_m: default_scale_m(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            directory: default_output_dir(),
        }
    }
}

fn default_dataset_url() -> String {
    TOLL_ROAD_URL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(TEMP_PATH)
}

fn default_per_point_area_ha() -> f64 {
    AREA_PER_POINT_HA
}

fn default_max_points() -> usize {
    MAX_SAMPLE_POINTS
}

fn default_scale_m() -> f64 {
    SAMPLE_SCALE_M
}

fn default_seed() -> u64 {
    42
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Explicit path if given, otherwise the first default location that
    /// exists, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for candidate in DEFAULT_LOCATIONS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                log::info!("Using settings from {}", path.display());
                return Self::from_file(&path);
            }
        }
        log::debug!("No settings file found, using defaults");
        Ok(Settings::default())
    }

    fn validate(&self) -> Result<()> {
        if !(self.analysis.per_point_area_ha > 0.0) {
            anyhow::bail!("analysis.per_point_area_ha must be positive");
        }
        if self.analysis.max_points == 0 {
            anyhow::bail!("analysis.max_points must be at least 1");
        }
        if !(self.analysis.scale_m > 0.0) {
            anyhow::bail!("analysis.scale_m must be positive");
        }
        if self.dataset.path.is_none() {
            Url::parse(&self.dataset.url)
                .with_context(|| format!("dataset.url is not a valid URL: {}", self.dataset.url))?;
        }
        if let Some(endpoint) = &self.imagery.endpoint {
            Url::parse(endpoint)
                .with_context(|| format!("imagery.endpoint is not a valid URL: {}", endpoint))?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = get(ENV_IMAGERY_TOKEN) {
            self.imagery.token = Some(token);
        }
        if let Some(endpoint) = get(ENV_IMAGERY_ENDPOINT) {
            self.imagery.endpoint = Some(endpoint);
        }
        if let Some(url) = get(ENV_DATASET_URL) {
            self.dataset.url = url;
            self.dataset.path = None;
        }
        self
    }

    pub fn dataset_source(&self) -> DatasetSource {
        match &self.dataset.path {
            Some(path) => DatasetSource::File(path.clone()),
            None => DatasetSource::Url(self.dataset.url.clone()),
        }
    }

    pub fn imagery_credentials(&self) -> ImageryCredentials {
        ImageryCredentials {
            token: self.imagery.token.clone(),
            project: self.imagery.project.clone(),
        }
    }

    pub fn imagery_timeout(&self) -> Option<Duration> {
        self.imagery.timeout_secs.map(Duration::from_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            area_per_point_ha: self.analysis.per_point_area_ha,
            max_points: self.analysis.max_points,
            scale_m: self.analysis.scale_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.analysis.max_points, 500);
        assert_eq!(settings.dataset_source(), DatasetSource::default());
        assert!(settings.imagery_timeout().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[dataset]
path = "data/tol.geojson"

[imagery]
endpoint = "https://imagery.example.org/v1/ndvi-sample"
project = "smart-grass"
timeout_secs = 60

[analysis]
max_points = 200
seed = 7

[output]
directory = "reports"
"#;
        let settings = Settings::from_toml_str(toml).unwrap();
        assert_eq!(
            settings.dataset_source(),
            DatasetSource::File(PathBuf::from("data/tol.geojson"))
        );
        assert_eq!(settings.imagery_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(settings.imagery_credentials().project.as_deref(), Some("smart-grass"));
        assert_eq!(settings.pipeline_settings().max_points, 200);
        assert_eq!(settings.pipeline_settings().area_per_point_ha, 0.01);
        assert_eq!(settings.analysis.seed, 7);
        assert_eq!(settings.output.directory, PathBuf::from("reports"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Settings::from_toml_str("[analysis]\nmax_points = 0\n").is_err());
        assert!(Settings::from_toml_str("[analysis]\nscale_m = -10.0\n").is_err());
        assert!(Settings::from_toml_str("[imagery]\nendpoint = \"not a url\"\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_IMAGERY_TOKEN, "secret"),
            (ENV_DATASET_URL, "https://mirror.example.org/tol.geojson"),
            (ENV_IMAGERY_ENDPOINT, "  "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.dataset.path = Some(PathBuf::from("local.geojson"));
        let settings = settings.with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.imagery.token.as_deref(), Some("secret"));
        assert!(settings.imagery.endpoint.is_none());
        assert_eq!(
            settings.dataset_source(),
            DatasetSource::Url("https://mirror.example.org/tol.geojson".to_string())
        );
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(Settings::load(Some(Path::new("/nonexistent/smartgrass.toml"))).is_err());
    }
}
