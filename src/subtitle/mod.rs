// Subtitle timing discovery
//
// - Selector: chooses the stream whose cues drive screenshot selection
// - Extractor: samples packet timing in a few windows and turns it into
//   display intervals, with one strategy per encoding family

pub mod extractor;
pub mod selector;

pub use extractor::*;
pub use selector::*;

/// Display interval of one subtitle cue, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtitleEvent {
    pub start_time: f64,
    pub end_time: f64,
}

impl SubtitleEvent {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self { start_time, end_time }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Fully inside `[start, end]`
    pub fn within(&self, start: f64, end: f64) -> bool {
        self.start_time >= start && self.end_time <= end
    }
}
