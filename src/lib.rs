//! Media proxy - subtitle-aware screenshots and mediainfo over HTTP
//!
//! Resolves a video from a file or directory path, samples its subtitle
//! timing to pick representative frames, renders them with mpv and uploads
//! them to an image host.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod probe;
pub mod resolver;
pub mod screenshot;
pub mod server;
pub mod subtitle;
pub mod upload;
pub mod workflow;
