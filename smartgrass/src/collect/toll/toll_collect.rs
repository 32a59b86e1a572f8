use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use crate::collect::global_variables::{TEMP_PATH, TOLL_ROAD_CACHE_NAME, TOLL_ROAD_URL};
use crate::error::DatasetError;
use crate::geometric::road::SegmentTable;

/// Where the toll-road reference dataset comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Url(String),
    File(PathBuf),
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Url(TOLL_ROAD_URL.to_string())
    }
}

/// Loader for the toll-road reference dataset.
///
/// Downloads are cached in the temp directory so later processes start
/// without the network; pass `refresh` to force a new download.
pub struct TollRoadCollect {
    source: DatasetSource,
    cache_dir: Option<PathBuf>,
    refresh: bool,
}

impl TollRoadCollect {
    pub fn new(source: DatasetSource) -> Self {
        TollRoadCollect {
            source,
            cache_dir: Some(PathBuf::from(TEMP_PATH)),
            refresh: false,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Load and validate the segment table. Any failure here is fatal for
    /// the process: no analysis can run without it.
    pub fn load(&self) -> Result<SegmentTable> {
        let content = match &self.source {
            DatasetSource::File(path) => read_file(path)?,
            DatasetSource::Url(url) => self.fetch_cached(url)?,
        };

        let table = SegmentTable::from_geojson_str(&content)
            .context("Toll-road dataset is not a usable segment table")?;
        if table.is_empty() {
            anyhow::bail!("Toll-road dataset contains no usable segments");
        }
        Ok(table)
    }

    fn cache_path(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(TOLL_ROAD_CACHE_NAME))
    }

    fn fetch_cached(&self, url: &str) -> Result<String> {
        if let Some(cache_path) = self.cache_path() {
            if cache_path.exists() && !self.refresh {
                log::info!("Using cached toll-road dataset {}", cache_path.display());
                return read_file(&cache_path);
            }
        }

        log::info!("Downloading toll-road dataset from {}", url);
        let bytes = download(url).with_context(|| format!("Failed to download {}", url))?;

        if let Some(cache_path) = self.cache_path() {
            if let Some(parent) = cache_path.parent() {
                create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            write(&cache_path, &bytes).with_context(|| {
                format!("Failed to cache toll-road dataset to {}", cache_path.display())
            })?;
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn download(url: &str) -> Result<Vec<u8>, DatasetError> {
    let response = Client::new().get(url).send()?;
    if !response.status().is_success() {
        return Err(DatasetError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.bytes()?.to_vec())
}

fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(DatasetError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"ruas": "Tangerang - Merak", "provinsi": "Banten"},
         "geometry": {"type": "LineString", "coordinates": [[106.40, -6.18], [106.10, -6.05]]}}
    ]}"#;

    #[test]
    fn test_default_source_is_bpjt() {
        assert_eq!(
            DatasetSource::default(),
            DatasetSource::Url(TOLL_ROAD_URL.to_string())
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tol.geojson");
        std::fs::write(&path, DATASET).unwrap();

        let table = TollRoadCollect::new(DatasetSource::File(path)).load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.segments()[0].ruas, "Tangerang - Merak");
    }

    #[test]
    fn test_cached_url_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOLL_ROAD_CACHE_NAME), DATASET).unwrap();

        let collect = TollRoadCollect::new(DatasetSource::Url("http://invalid.localhost/x".into()))
            .with_cache_dir(Some(dir.path().to_path_buf()));
        assert_eq!(collect.load().unwrap().len(), 1);
    }

    #[test]
    fn test_refresh_ignores_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOLL_ROAD_CACHE_NAME), DATASET).unwrap();

        // nothing listens there, so only a real download attempt fails
        let collect = TollRoadCollect::new(DatasetSource::Url("http://127.0.0.1:9/tol.geojson".into()))
            .with_cache_dir(Some(dir.path().to_path_buf()))
            .refresh(true);
        assert!(collect.load().is_err());
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.geojson");
        std::fs::write(&path, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(TollRoadCollect::new(DatasetSource::File(path)).load().is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let collect = TollRoadCollect::new(DatasetSource::File("/nonexistent/tol.geojson".into()));
        assert!(collect.load().is_err());
    }
}
