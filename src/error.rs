use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No video file found in directory: {0}")]
    NoVideoFound(String),

    #[error("Unable to determine the largest video file in: {0}")]
    AmbiguousSelection(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("{0} timed out after {1} seconds")]
    ToolTimeout(String, u64),

    #[error("Failed to parse probe output: {0}")]
    ProbeParse(String),

    #[error("No subtitle events found in the sampled windows")]
    NoEventsExtracted,

    #[error("Too few image subtitle packets to pair ({0})")]
    InsufficientPackets(usize),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Screenshot {index} {stage} failed: {source}")]
    Screenshot {
        index: usize,
        stage: &'static str,
        #[source]
        source: Box<ProxyError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Errors caused by the caller's request rather than by a tool or the network.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidInput(_)
                | ProxyError::UnsupportedFormat(_)
                | ProxyError::NoVideoFound(_)
                | ProxyError::AmbiguousSelection(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
