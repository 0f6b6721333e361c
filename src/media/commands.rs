use std::path::Path;

use crate::config::{MediaInfoConfig, ProbeConfig, RendererConfig};

/// External tool invocation: binary, argument list and a human readable description
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Quiet ffprobe logging
    pub fn log_level<S: Into<String>>(self, level: S) -> Self {
        self.arg("-v").arg(level)
    }

    /// Emit ffprobe output as JSON
    pub fn json_output(self) -> Self {
        self.arg("-print_format").arg("json")
    }

    /// Restrict ffprobe to the given stream specifier
    pub fn select_streams<S: Into<String>>(self, spec: S) -> Self {
        self.arg("-select_streams").arg(spec)
    }

    /// Restrict ffprobe to the given entries
    pub fn show_entries<S: Into<String>>(self, entries: S) -> Self {
        self.arg("-show_entries").arg(entries)
    }

    /// Full command line, for logging
    pub fn command_line(&self) -> String {
        let mut line = self.binary_path.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Builds ffprobe invocations
#[derive(Debug, Clone)]
pub struct ProbeCommandBuilder {
    binary_path: String,
}

impl ProbeCommandBuilder {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
        }
    }

    /// Container duration as a bare number on stdout
    pub fn duration<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Duration probe")
            .log_level("error")
            .show_entries("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .path(video_path)
    }

    /// Subtitle streams with their dispositions, whole container
    pub fn subtitle_streams<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Subtitle stream probe")
            .log_level("quiet")
            .json_output()
            .show_entries("stream=index,codec_name,codec_type,disposition")
            .select_streams("s")
            .path(video_path)
    }

    /// Packet timing for one stream inside a single read interval
    pub fn packets<P: AsRef<Path>>(&self, video_path: P, stream_index: u32, interval: &str) -> MediaCommand {
        MediaCommand::new(&self.binary_path, format!("Subtitle packet probe ({})", interval))
            .log_level("quiet")
            .arg("-read_intervals")
            .arg(interval)
            .json_output()
            .arg("-show_packets")
            .select_streams(stream_index.to_string())
            .path(video_path)
    }
}

/// Builds mpv single-frame captures
#[derive(Debug, Clone)]
pub struct RendererCommandBuilder {
    config: RendererConfig,
}

impl RendererCommandBuilder {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Decode exactly one frame at `time_point` into `output_path`, tone-mapped to SDR
    pub fn screenshot<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: Q,
        time_point: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, format!("Frame capture at {:.2}s", time_point))
            .arg("--no-audio")
            .arg(format!("--start={:.2}", time_point))
            .arg("--frames=1")
            .arg(format!("--target-trc={}", self.config.target_trc))
            .arg(format!("--tone-mapping={}", self.config.tone_mapping))
            .arg(format!("--o={}", output_path.as_ref().display()))
            .path(video_path)
    }
}

/// Builds mediainfo text reports
pub fn mediainfo_report<P: AsRef<Path>>(config: &MediaInfoConfig, video_path: P) -> MediaCommand {
    MediaCommand::new(&config.binary_path, "MediaInfo report")
        .arg("--Output=text")
        .path(video_path)
}
