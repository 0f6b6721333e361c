use tracing::{info, warn};

use crate::probe::{CodecFamily, SubtitleStreamInfo};

const PREFERENCE: [CodecFamily; 3] = [CodecFamily::Ass, CodecFamily::Subrip, CodecFamily::Pgs];

/// Pick the stream whose timing drives screenshot selection.
///
/// Normal ASS beats normal SubRip beats normal PGS, lowest index first within
/// a family. Without any of those the first stream is used whatever it is.
/// `None` means there is no subtitle stream at all.
pub fn select_stream(streams: &[SubtitleStreamInfo]) -> Option<&SubtitleStreamInfo> {
    for family in PREFERENCE {
        if let Some(stream) = streams
            .iter()
            .find(|s| s.is_normal && s.codec_family == family)
        {
            info!("Selected subtitle stream {} ({})", stream.index, stream.codec_name);
            return Some(stream);
        }
    }

    match streams.first() {
        Some(stream) => {
            warn!(
                "No normal ASS/SRT/PGS stream, falling back to first stream {} ({})",
                stream.index, stream.codec_name
            );
            Some(stream)
        }
        None => {
            info!("No embedded subtitle streams");
            None
        }
    }
}
