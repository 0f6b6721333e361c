use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProbeConfig;
use crate::error::{ProxyError, Result};
use crate::media::{ProbeCommandBuilder, ProcessRunner};
use crate::probe::CodecFamily;
use super::SubtitleEvent;

/// Cues this short or shorter are treated as noise
pub const MIN_EVENT_SECONDS: f64 = 0.1;

/// A time range ffprobe is asked to read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadInterval {
    pub start: f64,
    pub end: f64,
}

impl ReadInterval {
    /// `-read_intervals` syntax, `start%end`
    pub fn to_arg(&self) -> String {
        format!("{:.2}%{:.2}", self.start, self.end)
    }
}

/// Sampling windows at fixed fractions of the duration, clamped to the end of the file
pub fn read_intervals(duration: f64, config: &ProbeConfig) -> Vec<ReadInterval> {
    config
        .window_points
        .iter()
        .map(|point| {
            let start = duration * point;
            ReadInterval {
                start,
                end: (start + config.window_seconds).min(duration),
            }
        })
        .collect()
}

/// Timing of one subtitle packet
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Packet {
    pub pts_time: Option<f64>,
    pub duration_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PacketsOutput {
    #[serde(default)]
    packets: Vec<RawPacket>,
}

#[derive(Debug, Deserialize)]
struct RawPacket {
    pts_time: Option<String>,
    duration_time: Option<String>,
}

/// Parse `-show_packets` JSON, skipping any preamble before the first `{`
pub fn parse_packets(output: &str) -> Result<Vec<Packet>> {
    let start = output
        .find('{')
        .ok_or_else(|| ProxyError::ProbeParse("no JSON object in packet output".to_string()))?;

    let parsed: PacketsOutput = serde_json::from_str(&output[start..])
        .map_err(|e| ProxyError::ProbeParse(format!("packet JSON: {}", e)))?;

    Ok(parsed
        .packets
        .into_iter()
        .map(|raw| Packet {
            pts_time: raw.pts_time.and_then(|s| s.parse().ok()),
            duration_time: raw.duration_time.and_then(|s| s.parse().ok()),
        })
        .collect())
}

/// Turns per-window packet lists into display intervals
pub trait IntervalExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn events(&self, windows: &[Vec<Packet>]) -> Result<Vec<SubtitleEvent>>;
}

/// Text subtitles (ASS, SubRip): every packet carries its own duration
#[derive(Debug, Default)]
pub struct TextPacketExtractor;

impl IntervalExtractor for TextPacketExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn events(&self, windows: &[Vec<Packet>]) -> Result<Vec<SubtitleEvent>> {
        let events: Vec<SubtitleEvent> = windows
            .iter()
            .flatten()
            .filter_map(|packet| match (packet.pts_time, packet.duration_time) {
                (Some(start), Some(duration)) if duration > MIN_EVENT_SECONDS => {
                    Some(SubtitleEvent::new(start, start + duration))
                }
                _ => None,
            })
            .collect();

        if events.is_empty() {
            return Err(ProxyError::NoEventsExtracted);
        }
        Ok(events)
    }
}

/// Image subtitles (PGS): packets alternate show/hide with no duration
#[derive(Debug, Default)]
pub struct ImagePacketExtractor;

impl IntervalExtractor for ImagePacketExtractor {
    fn name(&self) -> &'static str {
        "image"
    }

    fn events(&self, windows: &[Vec<Packet>]) -> Result<Vec<SubtitleEvent>> {
        let total: usize = windows.iter().map(Vec::len).sum();
        if total < 2 {
            return Err(ProxyError::InsufficientPackets(total));
        }

        // pairs never straddle two windows
        let events: Vec<SubtitleEvent> = windows
            .iter()
            .flat_map(|packets| packets.chunks_exact(2))
            .filter_map(|pair| match (pair[0].pts_time, pair[1].pts_time) {
                (Some(start), Some(end)) if end - start > MIN_EVENT_SECONDS => {
                    Some(SubtitleEvent::new(start, end))
                }
                _ => None,
            })
            .collect();

        if events.is_empty() {
            return Err(ProxyError::NoEventsExtracted);
        }
        Ok(events)
    }
}

/// Strategy for a codec family; `None` when timing cannot be extracted
pub fn extractor_for(family: CodecFamily) -> Option<Box<dyn IntervalExtractor>> {
    match family {
        CodecFamily::Ass | CodecFamily::Subrip => Some(Box::new(TextPacketExtractor)),
        CodecFamily::Pgs => Some(Box::new(ImagePacketExtractor)),
        CodecFamily::Other => None,
    }
}

/// Reads packets for the sampling windows and hands them to a strategy
pub struct SubtitleEventExtractor {
    config: ProbeConfig,
    runner: Arc<dyn ProcessRunner>,
    commands: ProbeCommandBuilder,
}

impl SubtitleEventExtractor {
    pub fn new(config: &ProbeConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: config.clone(),
            runner,
            commands: ProbeCommandBuilder::new(config),
        }
    }

    pub async fn extract(
        &self,
        video_path: &Path,
        stream_index: u32,
        duration: f64,
        extractor: &dyn IntervalExtractor,
    ) -> Result<Vec<SubtitleEvent>> {
        let intervals = read_intervals(duration, &self.config);
        info!(
            "Sampling {} windows of stream {} for {} subtitle timing",
            intervals.len(),
            stream_index,
            extractor.name()
        );

        let mut windows = Vec::with_capacity(intervals.len());
        for interval in &intervals {
            let command = self.commands.packets(video_path, stream_index, &interval.to_arg());
            let output = self.runner.run(&command).await?;
            let packets = parse_packets(&output)?;
            debug!("Window {} yielded {} packets", interval.to_arg(), packets.len());
            windows.push(packets);
        }

        let events = extractor.events(&windows)?;
        info!("Extracted {} subtitle events", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn text(start: f64, duration: f64) -> Packet {
        Packet {
            pts_time: Some(start),
            duration_time: Some(duration),
        }
    }

    fn image(pts: f64) -> Packet {
        Packet {
            pts_time: Some(pts),
            duration_time: None,
        }
    }

    #[test]
    fn test_read_intervals_for_long_video() {
        let config = Config::default();
        let intervals = read_intervals(3600.0, &config.probe);
        let args: Vec<String> = intervals.iter().map(ReadInterval::to_arg).collect();
        assert_eq!(
            args,
            vec!["720.00%780.00", "1440.00%1500.00", "2160.00%2220.00", "2880.00%2940.00"]
        );
    }

    #[test]
    fn test_read_intervals_clamped_to_duration() {
        let config = Config::default();
        let intervals = read_intervals(100.0, &config.probe);
        assert_eq!(intervals[3], ReadInterval { start: 80.0, end: 100.0 });
        assert!(intervals.iter().all(|i| i.end <= 100.0));
    }

    #[test]
    fn test_parse_packets_skips_preamble() {
        let output = "Input #0, matroska,webm, from 'x.mkv':\n{\n \"packets\": [\n  {\"codec_type\": \"subtitle\", \"pts_time\": \"721.500000\", \"duration_time\": \"2.250000\"},\n  {\"pts_time\": \"N/A\"}\n ]\n}";
        let packets = parse_packets(output).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], text(721.5, 2.25));
        assert_eq!(packets[1], Packet::default());
    }

    #[test]
    fn test_parse_packets_without_json() {
        assert!(matches!(parse_packets("nothing here"), Err(ProxyError::ProbeParse(_))));
        assert!(matches!(parse_packets("{ broken"), Err(ProxyError::ProbeParse(_))));
    }

    #[test]
    fn test_text_extractor_drops_short_cues() {
        let windows = vec![
            vec![text(10.0, 0.1), text(20.0, 0.05), text(30.0, 1.5)],
            vec![text(40.0, 0.0), text(50.0, 2.0)],
        ];
        let events = TextPacketExtractor.events(&windows).unwrap();
        assert_eq!(events, vec![SubtitleEvent::new(30.0, 31.5), SubtitleEvent::new(50.0, 52.0)]);
    }

    #[test]
    fn test_text_extractor_without_events() {
        let windows = vec![vec![text(10.0, 0.1)], vec![]];
        assert!(matches!(TextPacketExtractor.events(&windows), Err(ProxyError::NoEventsExtracted)));
    }

    #[test]
    fn test_image_extractor_pairs_show_and_hide() {
        let windows = vec![
            vec![image(100.0), image(103.0), image(110.0), image(110.05)],
            vec![image(200.0), image(204.0), image(300.0)],
        ];
        let events = ImagePacketExtractor.events(&windows).unwrap();
        assert_eq!(events, vec![SubtitleEvent::new(100.0, 103.0), SubtitleEvent::new(200.0, 204.0)]);
    }

    #[test]
    fn test_image_extractor_needs_two_packets() {
        let windows = vec![vec![image(100.0)], vec![]];
        assert!(matches!(
            ImagePacketExtractor.events(&windows),
            Err(ProxyError::InsufficientPackets(1))
        ));
    }

    #[test]
    fn test_image_extractor_rejects_inverted_pairs() {
        let windows = vec![vec![image(105.0), image(100.0)]];
        assert!(matches!(ImagePacketExtractor.events(&windows), Err(ProxyError::NoEventsExtracted)));
    }

    #[test]
    fn test_extractor_for_family() {
        assert_eq!(extractor_for(CodecFamily::Ass).unwrap().name(), "text");
        assert_eq!(extractor_for(CodecFamily::Subrip).unwrap().name(), "text");
        assert_eq!(extractor_for(CodecFamily::Pgs).unwrap().name(), "image");
        assert!(extractor_for(CodecFamily::Other).is_none());
    }
}
