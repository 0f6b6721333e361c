use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{ProxyError, Result};

fn default_window_points() -> Vec<f64> {
    vec![0.2, 0.4, 0.6, 0.8]
}

fn default_fallback_percentages() -> Vec<f64> {
    vec![0.15, 0.30, 0.50, 0.70, 0.85]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    pub renderer: RendererConfig,
    pub mediainfo: MediaInfoConfig,
    pub screenshot: ScreenshotConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Path to ffprobe binary
    pub binary_path: String,
    /// Length of each subtitle sampling window (seconds)
    pub window_seconds: f64,
    /// Window start positions as fractions of total duration
    #[serde(default = "default_window_points")]
    pub window_points: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Path to mpv binary
    pub binary_path: String,
    /// Output transfer characteristic, keeps HDR sources viewable as SDR
    pub target_trc: String,
    /// Tone-mapping operator
    pub tone_mapping: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfoConfig {
    /// Path to mediainfo binary
    pub binary_path: String,
    /// Hard limit for a single report
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Number of screenshots per request
    pub count: usize,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Fixed positions used when subtitles cannot drive selection
    #[serde(default = "default_fallback_percentages")]
    pub fallback_percentages: Vec<f64>,
    /// Start of the golden window as a fraction of duration
    pub golden_start: f64,
    /// End of the golden window as a fraction of duration
    pub golden_end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Image host upload endpoint
    pub endpoint: String,
    /// Value of the `content_type` form field
    pub content_type: String,
    /// Prefix of the display URL returned by the host
    pub show_url_prefix: String,
    /// Replacement prefix producing the direct image URL
    pub direct_url_prefix: String,
    /// Total attempts per image, including the first
    pub max_attempts: u32,
    /// Backoff unit; attempt N waits N * backoff_secs before retrying
    pub backoff_secs: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl MediaInfoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9090,
            },
            probe: ProbeConfig {
                binary_path: "ffprobe".to_string(),
                window_seconds: 60.0,
                window_points: default_window_points(),
            },
            renderer: RendererConfig {
                binary_path: "mpv".to_string(),
                target_trc: "srgb".to_string(),
                tone_mapping: "hable".to_string(),
            },
            mediainfo: MediaInfoConfig {
                binary_path: "mediainfo".to_string(),
                timeout_secs: 300,
            },
            screenshot: ScreenshotConfig {
                count: 5,
                jpeg_quality: 85,
                fallback_percentages: default_fallback_percentages(),
                golden_start: 0.30,
                golden_end: 0.80,
            },
            upload: UploadConfig {
                endpoint: "https://api.pixhost.to/images".to_string(),
                content_type: "0".to_string(),
                show_url_prefix: "https://pixhost.to/show/".to_string(),
                direct_url_prefix: "https://img1.pixhost.to/images/".to_string(),
                max_attempts: 3,
                backoff_secs: 2,
                timeout_secs: 60,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProxyError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ProxyError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProxyError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ProxyError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.screenshot.count == 0 {
            return Err(ProxyError::Config("screenshot.count must be at least 1".to_string()));
        }
        if self.screenshot.fallback_percentages.len() != self.screenshot.count {
            return Err(ProxyError::Config(format!(
                "screenshot.fallback_percentages must have {} entries",
                self.screenshot.count
            )));
        }
        if !(1..=100).contains(&self.screenshot.jpeg_quality) {
            return Err(ProxyError::Config("screenshot.jpeg_quality must be within 1-100".to_string()));
        }
        if self.screenshot.golden_start >= self.screenshot.golden_end {
            return Err(ProxyError::Config("screenshot.golden_start must be below golden_end".to_string()));
        }
        if self.upload.max_attempts == 0 {
            return Err(ProxyError::Config("upload.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 18080;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 18080);
        assert_eq!(loaded.screenshot.count, 5);
        assert_eq!(loaded.upload.max_attempts, 3);
    }

    #[test]
    fn test_config_rejects_mismatched_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.screenshot.fallback_percentages = vec![0.5];
        config.save_to_file(&path).unwrap();

        assert!(matches!(Config::from_file(&path), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_unparsable_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ProxyError::Config(ref msg) if msg.starts_with("Failed to parse config file")));
    }
}
