use chrono::Utc;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::media::{ProcessRunner, ProcessRunnerFactory, mediainfo_report};
use crate::probe::{MediaProber, ProbeResult};
use crate::resolver::resolve_video;
use crate::screenshot::{CapturePipeline, PointSelector, render_bbcode};
use crate::subtitle::{SubtitleEvent, SubtitleEventExtractor, extractor_for, select_stream};
use crate::upload::{ImageHost, PixhostClient};

/// Outcome of a successful screenshot request
#[derive(Debug, Clone)]
pub struct ScreenshotReport {
    pub video_path: PathBuf,
    pub points: Vec<f64>,
    pub urls: Vec<String>,
    pub bbcode: String,
}

pub struct Workflow {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
    prober: MediaProber,
    extractor: SubtitleEventExtractor,
    selector: PointSelector,
    pipeline: CapturePipeline,
}

impl Workflow {
    /// Workflow over real child processes and the configured image host
    pub fn new(config: Config) -> Result<Self> {
        let host: Arc<dyn ImageHost> = Arc::new(PixhostClient::new(&config.upload)?);
        Ok(Self::with_components(config, ProcessRunnerFactory::create_system(), host))
    }

    pub fn with_components(config: Config, runner: Arc<dyn ProcessRunner>, host: Arc<dyn ImageHost>) -> Self {
        Self {
            prober: MediaProber::new(&config.probe, runner.clone()),
            extractor: SubtitleEventExtractor::new(&config.probe, runner.clone()),
            selector: PointSelector::new(&config.screenshot),
            pipeline: CapturePipeline::new(&config, runner.clone(), host),
            runner,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Screenshot request with a generator seeded from the wall clock
    pub async fn screenshots(&self, remote_path: &str) -> Result<ScreenshotReport> {
        let seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
        let mut rng = StdRng::seed_from_u64(seed);
        self.screenshots_with_rng(remote_path, &mut rng).await
    }

    pub async fn screenshots_with_rng<R: Rng + Send>(
        &self,
        remote_path: &str,
        rng: &mut R,
    ) -> Result<ScreenshotReport> {
        info!("Screenshot request for {}", remote_path);
        if remote_path.trim().is_empty() {
            return Err(ProxyError::InvalidInput("remote_path must not be empty".to_string()));
        }

        let video_path = resolve_video(remote_path)?;
        let probe = self.prober.probe(&video_path).await?;

        let events = self.subtitle_events(&video_path, &probe).await;
        let points = self.selector.select(&events, probe.duration, rng);
        info!("Screenshot points: {:?}", points);

        let urls = self.pipeline.run(&video_path, &points).await?;

        let bbcode = render_bbcode(urls.clone());
        info!("All {} screenshots uploaded", urls.len());
        Ok(ScreenshotReport {
            video_path,
            points,
            urls,
            bbcode,
        })
    }

    /// Subtitle cues used for point selection; any failure yields none
    async fn subtitle_events(&self, video_path: &Path, probe: &ProbeResult) -> Vec<SubtitleEvent> {
        let Some(stream) = select_stream(&probe.subtitle_streams) else {
            return Vec::new();
        };

        let Some(extractor) = extractor_for(stream.codec_family) else {
            warn!(
                "Subtitle codec {} carries no usable timing, using fixed percentages",
                stream.codec_name
            );
            return Vec::new();
        };

        match self
            .extractor
            .extract(video_path, stream.index, probe.duration, extractor.as_ref())
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!("Subtitle timing unavailable, using fixed percentages: {}", e);
                Vec::new()
            }
        }
    }

    /// Full mediainfo text report of the resolved video
    pub async fn mediainfo(&self, remote_path: &str) -> Result<String> {
        info!("MediaInfo request for {}", remote_path);
        if remote_path.trim().is_empty() {
            return Err(ProxyError::InvalidInput("remote_path must not be empty".to_string()));
        }

        let video_path = resolve_video(remote_path)?;
        let command = mediainfo_report(&self.config.mediainfo, &video_path);
        let report = self
            .runner
            .run_with_timeout(&command, self.config.mediainfo.timeout())
            .await?;

        info!("MediaInfo report: {} bytes", report.len());
        Ok(report.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaCommand;
    use crate::upload::MockImageHost;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Stands in for ffprobe, mpv and mediainfo
    struct FakeRunner {
        duration: String,
        streams: String,
        /// Render call (1-based) that fails
        fail_render_at: Option<usize>,
        render_calls: AtomicUsize,
        timeouts: Mutex<Vec<Duration>>,
    }

    impl FakeRunner {
        fn new(duration: &str, streams: &str) -> Self {
            Self {
                duration: duration.to_string(),
                streams: streams.to_string(),
                fail_render_at: None,
                render_calls: AtomicUsize::new(0),
                timeouts: Mutex::new(Vec::new()),
            }
        }

        fn render(&self, command: &MediaCommand) -> Result<String> {
            let call = self.render_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_render_at == Some(call) {
                return Err(ProxyError::Tool("Frame capture failed: mpv exited 1".to_string()));
            }
            let output = command
                .args
                .iter()
                .find_map(|arg| arg.strip_prefix("--o="))
                .expect("renderer output path");
            RgbImage::from_pixel(32, 18, Rgb([10, 20, 30])).save(output).unwrap();
            Ok(String::new())
        }

        /// Three 2s cues at 1s, 10s and 20s into every sampled window
        fn packets(command: &MediaCommand) -> String {
            let interval = command
                .args
                .windows(2)
                .find(|w| w[0] == "-read_intervals")
                .map(|w| w[1].clone())
                .expect("read interval");
            let start: f64 = interval.split('%').next().unwrap().parse().unwrap();
            let packets: Vec<String> = [1.0, 10.0, 20.0]
                .iter()
                .map(|offset| {
                    format!(
                        r#"{{"pts_time": "{:.6}", "duration_time": "2.000000"}}"#,
                        start + offset
                    )
                })
                .collect();
            format!("[matroska @ 0x1] preamble\n{{\"packets\": [{}]}}", packets.join(","))
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn run(&self, command: &MediaCommand) -> Result<String> {
            if command.binary_path == "mpv" {
                return self.render(command);
            }
            if command.args.iter().any(|a| a == "format=duration") {
                return Ok(self.duration.clone());
            }
            if command.args.iter().any(|a| a == "-show_packets") {
                return Ok(Self::packets(command));
            }
            Ok(self.streams.clone())
        }

        async fn run_with_timeout(&self, command: &MediaCommand, timeout: Duration) -> Result<String> {
            self.timeouts.lock().unwrap().push(timeout);
            if command.binary_path == "mediainfo" {
                return Ok("\nGeneral\nComplete name : movie.mkv\n\n".to_string());
            }
            self.run(command).await
        }
    }

    fn counting_host(expected_calls: usize) -> MockImageHost {
        let mut host = MockImageHost::new();
        host.expect_upload().times(expected_calls).returning(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            Ok(format!("https://pixhost.to/show/7/{}", name))
        });
        host
    }

    fn movie_dir() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let movie = dir.path().join("movie.mkv");
        std::fs::write(&movie, b"matroska").unwrap();
        let path = movie.to_string_lossy().into_owned();
        (dir, path)
    }

    #[tokio::test]
    async fn test_no_subtitles_uses_fixed_points() {
        let (_dir, movie) = movie_dir();
        let runner = Arc::new(FakeRunner::new("3600.000000\n", r#"{"streams": []}"#));
        let workflow = Workflow::with_components(Config::default(), runner.clone(), Arc::new(counting_host(5)));

        let report = workflow
            .screenshots_with_rng(&movie, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();

        let expected = [540.0, 1080.0, 1800.0, 2520.0, 3060.0];
        for (point, want) in report.points.iter().zip(expected) {
            assert!((point - want).abs() < 1e-9);
        }
        assert_eq!(runner.render_calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.urls.len(), 5);
        assert!(report.urls.iter().all(|u| u.starts_with("https://img1.pixhost.to/images/7/ss_")));
        assert_eq!(report.bbcode.lines().count(), 5);
        assert!(report.bbcode.lines().all(|l| l.starts_with("[img]") && l.ends_with("[/img]")));
    }

    #[tokio::test]
    async fn test_first_render_failure_aborts_request() {
        let (_dir, movie) = movie_dir();
        let mut runner = FakeRunner::new("3600.000000\n", r#"{"streams": []}"#);
        runner.fail_render_at = Some(1);
        let runner = Arc::new(runner);
        let workflow = Workflow::with_components(Config::default(), runner.clone(), Arc::new(counting_host(0)));

        let err = workflow
            .screenshots_with_rng(&movie, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Screenshot { index: 1, stage: "capture", .. }));
        assert!(!err.is_input_error());
        assert_eq!(runner.render_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_exhaustion_stops_remaining_points() {
        let (_dir, movie) = movie_dir();
        let runner = Arc::new(FakeRunner::new("3600.000000\n", r#"{"streams": []}"#));
        let mut config = Config::default();
        config.upload.backoff_secs = 0;

        let mut host = MockImageHost::new();
        host.expect_upload()
            .times(3)
            .returning(|_| Err(ProxyError::Upload("host returned 500".to_string())));
        let workflow = Workflow::with_components(config, runner.clone(), Arc::new(host));

        let err = workflow
            .screenshots_with_rng(&movie, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Screenshot { index: 1, stage: "upload", .. }));
        assert_eq!(runner.render_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ass_subtitles_drive_golden_points() {
        let (_dir, movie) = movie_dir();
        let streams = r#"{"streams": [
            {"index": 2, "codec_name": "ass", "disposition": {"comment": 0, "hearing_impaired": 0, "visual_impaired": 0}}
        ]}"#;
        let runner = Arc::new(FakeRunner::new("3600.0", streams));
        let workflow = Workflow::with_components(Config::default(), runner, Arc::new(counting_host(5)));

        let report = workflow
            .screenshots_with_rng(&movie, &mut StdRng::seed_from_u64(11))
            .await
            .unwrap();

        // only the 40% and 60% windows lie inside [1080, 2880]
        assert_eq!(report.points.len(), 5);
        for point in &report.points {
            let in_40 = (1440.0..=1500.0).contains(point);
            let in_60 = (2160.0..=2220.0).contains(point);
            assert!(in_40 || in_60, "point {} outside golden windows", point);
        }
    }

    #[tokio::test]
    async fn test_unusable_subtitle_codec_falls_back() {
        let (_dir, movie) = movie_dir();
        let streams = r#"{"streams": [{"index": 3, "codec_name": "dvd_subtitle"}]}"#;
        let runner = Arc::new(FakeRunner::new("1000", streams));
        let workflow = Workflow::with_components(Config::default(), runner, Arc::new(counting_host(5)));

        let report = workflow
            .screenshots_with_rng(&movie, &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        let expected = [150.0, 300.0, 500.0, 700.0, 850.0];
        for (point, want) in report.points.iter().zip(expected) {
            assert!((point - want).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_bad_duration_is_tool_failure() {
        let (_dir, movie) = movie_dir();
        let runner = Arc::new(FakeRunner::new("N/A", r#"{"streams": []}"#));
        let workflow = Workflow::with_components(Config::default(), runner.clone(), Arc::new(counting_host(0)));

        let err = workflow.screenshots(&movie).await.unwrap_err();
        assert!(matches!(err, ProxyError::ProbeParse(_)));
        assert_eq!(runner.render_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_path_is_input_error() {
        let runner = Arc::new(FakeRunner::new("1", "{}"));
        let workflow = Workflow::with_components(Config::default(), runner, Arc::new(counting_host(0)));

        assert!(workflow.screenshots("  ").await.unwrap_err().is_input_error());
        assert!(workflow.mediainfo("").await.unwrap_err().is_input_error());
    }

    #[tokio::test]
    async fn test_mediainfo_is_trimmed_and_bounded() {
        let (_dir, movie) = movie_dir();
        let runner = Arc::new(FakeRunner::new("1", "{}"));
        let workflow = Workflow::with_components(Config::default(), runner.clone(), Arc::new(counting_host(0)));

        let report = workflow.mediainfo(&movie).await.unwrap();
        assert_eq!(report, "General\nComplete name : movie.mkv");
        assert_eq!(*runner.timeouts.lock().unwrap(), vec![Duration::from_secs(300)]);
    }
}
