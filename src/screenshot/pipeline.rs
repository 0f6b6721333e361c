use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::media::{ProcessRunner, RendererCommandBuilder};
use crate::upload::{ImageHost, RetryPolicy, direct_url, upload_with_retry};

/// Step of the per-point pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Convert,
    Upload,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Convert => "convert",
            Stage::Upload => "upload",
        }
    }
}

/// Decode an intermediate image and re-encode it as JPEG
pub fn convert_to_jpeg(source: &Path, dest: &Path, quality: u8) -> Result<()> {
    let rgb = image::open(source)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut writer = BufWriter::new(File::create(dest)?);
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        encoder.encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
    }
    writer.flush()?;

    info!(
        "Converted {} -> {} (quality {})",
        source.display(),
        dest.display(),
        quality
    );
    Ok(())
}

/// Capture, convert and upload, one point at a time; the first failure aborts the batch
pub struct CapturePipeline {
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn ImageHost>,
    renderer: RendererCommandBuilder,
    retry: RetryPolicy,
    config: Config,
}

impl CapturePipeline {
    pub fn new(config: &Config, runner: Arc<dyn ProcessRunner>, host: Arc<dyn ImageHost>) -> Self {
        Self {
            runner,
            host,
            renderer: RendererCommandBuilder::new(&config.renderer),
            retry: RetryPolicy::from_config(&config.upload),
            config: config.clone(),
        }
    }

    /// Direct image URLs in capture order
    pub async fn run(&self, video_path: &Path, points: &[f64]) -> Result<Vec<String>> {
        // removed on drop, whichever way this returns
        let work_dir = tempfile::Builder::new().prefix("screenshots-").tempdir()?;
        let mut urls = Vec::with_capacity(points.len());

        for (i, point) in points.iter().enumerate() {
            let index = i + 1;
            info!("Processing screenshot {}/{} at {:.2}s", index, points.len(), *point);

            let url = self
                .process_point(video_path, work_dir.path(), index, *point)
                .await
                .map_err(|(stage, source)| {
                    error!("Screenshot {} {} failed: {}", index, stage.as_str(), source);
                    ProxyError::Screenshot {
                        index,
                        stage: stage.as_str(),
                        source: Box::new(source),
                    }
                })?;

            urls.push(url);
        }

        Ok(urls)
    }

    async fn process_point(
        &self,
        video_path: &Path,
        work_dir: &Path,
        index: usize,
        point: f64,
    ) -> std::result::Result<String, (Stage, ProxyError)> {
        let stem = format!("ss_{}_{}", index, Uuid::new_v4().simple());
        let frame_path = work_dir.join(format!("{}_temp.png", stem));
        let jpeg_path = work_dir.join(format!("{}.jpg", stem));

        self.capture(video_path, &frame_path, point)
            .await
            .map_err(|e| (Stage::Capture, e))?;

        self.convert(frame_path, jpeg_path.clone())
            .await
            .map_err(|e| (Stage::Convert, e))?;

        let show_url = upload_with_retry(self.host.as_ref(), &jpeg_path, self.retry)
            .await
            .map_err(|e| (Stage::Upload, e))?;

        Ok(direct_url(&show_url, &self.config.upload))
    }

    async fn capture(&self, video_path: &Path, frame_path: &Path, point: f64) -> Result<()> {
        let command = self.renderer.screenshot(video_path, frame_path, point);
        self.runner.run(&command).await?;
        info!("Captured frame -> {}", frame_path.display());
        Ok(())
    }

    async fn convert(&self, source: PathBuf, dest: PathBuf) -> Result<()> {
        let quality = self.config.screenshot.jpeg_quality;
        tokio::task::spawn_blocking(move || convert_to_jpeg(&source, &dest, quality))
            .await
            .map_err(|e| ProxyError::Io(std::io::Error::other(e)))?
    }
}
