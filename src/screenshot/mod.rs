// Screenshot selection and processing
//
// - Points: picks timestamps from subtitle cues or fixed percentages
// - Pipeline: renders, compresses and uploads each timestamp in order

pub mod pipeline;
pub mod points;

pub use pipeline::*;
pub use points::*;

/// BBCode image markup, one line per URL, sorted lexically
pub fn render_bbcode(mut urls: Vec<String>) -> String {
    urls.sort();
    urls.iter()
        .map(|url| format!("[img]{}[/img]", url))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
