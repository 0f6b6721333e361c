//! Duration and subtitle-stream discovery through ffprobe.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::error::{ProxyError, Result};
use crate::media::{ProbeCommandBuilder, ProcessRunner};

/// Subtitle encoding family, as far as screenshot selection cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    Ass,
    Subrip,
    Pgs,
    Other,
}

impl CodecFamily {
    pub fn from_codec_name(name: &str) -> Self {
        match name {
            "ass" => CodecFamily::Ass,
            "subrip" => CodecFamily::Subrip,
            "hdmv_pgs_subtitle" => CodecFamily::Pgs,
            _ => CodecFamily::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStreamInfo {
    /// Container-relative stream index
    pub index: u32,
    pub codec_name: String,
    pub codec_family: CodecFamily,
    /// No comment, hearing-impaired or visual-impaired disposition
    pub is_normal: bool,
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Seconds, always positive
    pub duration: f64,
    pub subtitle_streams: Vec<SubtitleStreamInfo>,
}

#[derive(Debug, Deserialize)]
struct StreamsOutput {
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    index: u32,
    #[serde(default)]
    codec_name: String,
    #[serde(default)]
    disposition: Disposition,
}

#[derive(Debug, Default, Deserialize)]
struct Disposition {
    #[serde(default)]
    comment: u8,
    #[serde(default)]
    hearing_impaired: u8,
    #[serde(default)]
    visual_impaired: u8,
}

/// Parse ffprobe's bare-number duration output
pub fn parse_duration(output: &str) -> Result<f64> {
    let trimmed = output.trim();
    let duration: f64 = trimmed
        .parse()
        .map_err(|_| ProxyError::ProbeParse(format!("duration is not a number: {:?}", trimmed)))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ProxyError::ProbeParse(format!("duration must be positive, got {}", duration)));
    }
    Ok(duration)
}

/// Parse the subtitle stream listing; malformed JSON degrades to no streams
pub fn parse_subtitle_streams(output: &str) -> Vec<SubtitleStreamInfo> {
    let parsed: StreamsOutput = match serde_json::from_str(output) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Ignoring unparsable subtitle stream listing: {}", e);
            return Vec::new();
        }
    };

    parsed
        .streams
        .into_iter()
        .map(|stream| SubtitleStreamInfo {
            index: stream.index,
            codec_family: CodecFamily::from_codec_name(&stream.codec_name),
            is_normal: stream.disposition.comment == 0
                && stream.disposition.hearing_impaired == 0
                && stream.disposition.visual_impaired == 0,
            codec_name: stream.codec_name,
        })
        .collect()
}

pub struct MediaProber {
    runner: Arc<dyn ProcessRunner>,
    commands: ProbeCommandBuilder,
}

impl MediaProber {
    pub fn new(config: &ProbeConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            commands: ProbeCommandBuilder::new(config),
        }
    }

    /// Total container duration in seconds
    pub async fn duration(&self, video_path: &Path) -> Result<f64> {
        info!("Probing duration of {}", video_path.display());
        let output = self.runner.run(&self.commands.duration(video_path)).await?;
        let duration = parse_duration(&output)?;
        info!("Duration: {:.2}s", duration);
        Ok(duration)
    }

    /// Every subtitle stream in the container, in container order
    pub async fn subtitle_streams(&self, video_path: &Path) -> Result<Vec<SubtitleStreamInfo>> {
        let output = self.runner.run(&self.commands.subtitle_streams(video_path)).await?;
        let streams = parse_subtitle_streams(&output);
        info!("Found {} embedded subtitle stream(s)", streams.len());
        Ok(streams)
    }

    /// Duration plus subtitle streams. Only the duration is mandatory.
    pub async fn probe(&self, video_path: &Path) -> Result<ProbeResult> {
        let duration = self.duration(video_path).await?;
        let subtitle_streams = match self.subtitle_streams(video_path).await {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Subtitle stream probe failed, continuing without subtitles: {}", e);
                Vec::new()
            }
        };
        Ok(ProbeResult {
            duration,
            subtitle_streams,
        })
    }
}
