pub const TEMP_PATH: &str = "./temp";

/// Operational toll roads published by the Ministry of Public Works (BPJT)
pub const TOLL_ROAD_URL: &str =
    "https://data.pu.go.id/sites/default/files/geojson/ast_bpjt_tol_operasi.geojson";

/// Cached copy of the dataset inside TEMP_PATH
pub const TOLL_ROAD_CACHE_NAME: &str = "ast_bpjt_tol_operasi.geojson";

/// Sentinel-2 surface reflectance, harmonized processing baseline
pub const IMAGERY_COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";
pub const CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";
pub const NIR_BAND: &str = "B8";
pub const RED_BAND: &str = "B4";

/// Ground resolution of the pixel sample, in metres
pub const SAMPLE_SCALE_M: f64 = 10.0;
pub const MAX_SAMPLE_POINTS: usize = 500;

/// One 10 m pixel is 100 m², i.e. 0.01 ha
pub const AREA_PER_POINT_HA: f64 = 0.01;

/// Index computed from NIR_BAND and RED_BAND; also the sample property name
pub const INDEX_NAME: &str = "NDVI";
pub const NDVI_MAX: f64 = 1.0;

/// Width of the NDVI band just below the threshold used by the growth simulation
pub const PREDICTION_BAND_WIDTH: f64 = 0.15;
