use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    model::GeoPoint,
    platform::{ImageHandle, ImageQuery, SampleRequest},
    validate::ZeroCoordinates,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "NDVI_CONFIG";

/// Top-level configuration.
///
/// Example TOML:
/// ```toml
/// [server]
/// port = 8080
///
/// [earth_engine]
/// project = "my-gcp-project"
/// timeout_secs = 20
///
/// [validation]
/// zero_coordinates = "reject"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub earth_engine: EarthEngineConfig,
    pub imagery: ImageryConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EarthEngineConfig {
    /// Cloud project billed for computations; falls back to the service
    /// account's `project_id`.
    pub project: Option<String>,
    pub api_base: String,
    /// Overrides the token endpoint named in the service account.
    pub token_uri: Option<String>,
    /// Service account JSON on disk, used when `SERVICE_ACCOUNT` is unset.
    pub credentials_file: Option<PathBuf>,
    /// Deadline for startup authentication and for each lookup.
    pub timeout_secs: u64,
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            project: None,
            api_base: "https://earthengine.googleapis.com/v1".to_string(),
            token_uri: None,
            credentials_file: None,
            timeout_secs: 30,
        }
    }
}

impl EarthEngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What to look for on the platform. Defaults select the least-cloudy
/// Sentinel-2 scene of 2024 and its B8/B4 bands at 10 m.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageryConfig {
    pub collection: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    pub nir_band: String,
    pub red_band: String,
    pub cloud_property: String,
    pub scale: f64,
    pub max_pixels: f64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_HARMONIZED".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            nir_band: "B8".to_string(),
            red_band: "B4".to_string(),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            scale: 10.0,
            max_pixels: 1e9,
        }
    }
}

impl ImageryConfig {
    pub fn query_for(&self, point: GeoPoint) -> ImageQuery {
        ImageQuery {
            collection: self.collection.clone(),
            point,
            start: midnight_utc(self.start_date),
            end: midnight_utc(self.end_date),
            cloud_property: self.cloud_property.clone(),
        }
    }

    pub fn sample_for(&self, image: &ImageHandle, point: GeoPoint) -> SampleRequest {
        SampleRequest {
            image_id: image.id.clone(),
            nir_band: self.nir_band.clone(),
            red_band: self.red_band.clone(),
            point,
            scale: self.scale,
            max_pixels: self.max_pixels,
        }
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub zero_coordinates: ZeroCoordinates,
}

impl Config {
    /// Load config from `path`, `$NDVI_CONFIG`, or the platform config
    /// directory, in that order.
    ///
    /// An explicitly named file must exist; the platform default may be absent,
    /// in which case built-in defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let path = match explicit {
            Some(path) => path,
            None => {
                let path = Self::config_file_path()?;
                if !path.exists() {
                    // First run: no config file, use defaults.
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "ndvi", "ndvi-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `PORT` and `EE_PROJECT` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?;
        }

        if let Some(project) = lookup("EE_PROJECT").filter(|p| !p.is_empty()) {
            self.earth_engine.project = Some(project);
        }

        Ok(())
    }
}
