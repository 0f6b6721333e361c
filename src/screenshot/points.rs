use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::ScreenshotConfig;
use crate::subtitle::SubtitleEvent;

/// Chooses screenshot timestamps from subtitle cues.
///
/// Cues fully inside the golden window are preferred, which keeps frames
/// away from intros and credits. Each timestamp falls in the middle 80%
/// of a randomly drawn cue. Too few cues means fixed percentages instead;
/// the two sources are never mixed.
#[derive(Debug, Clone)]
pub struct PointSelector {
    count: usize,
    fallback_percentages: Vec<f64>,
    golden_start: f64,
    golden_end: f64,
}

impl PointSelector {
    pub fn new(config: &ScreenshotConfig) -> Self {
        Self {
            count: config.count,
            fallback_percentages: config.fallback_percentages.clone(),
            golden_start: config.golden_start,
            golden_end: config.golden_end,
        }
    }

    pub fn fallback_points(&self, duration: f64) -> Vec<f64> {
        self.fallback_percentages.iter().map(|p| duration * p).collect()
    }

    pub fn select<R: Rng + ?Sized>(&self, events: &[SubtitleEvent], duration: f64, rng: &mut R) -> Vec<f64> {
        if events.len() < self.count {
            warn!(
                "Only {} subtitle events (need {}), using fixed percentages",
                events.len(),
                self.count
            );
            return self.fallback_points(duration);
        }

        let golden_start = duration * self.golden_start;
        let golden_end = duration * self.golden_end;
        let golden: Vec<SubtitleEvent> = events
            .iter()
            .filter(|event| event.within(golden_start, golden_end))
            .copied()
            .collect();
        info!(
            "{} golden events between {:.2}s and {:.2}s",
            golden.len(),
            golden_start,
            golden_end
        );

        let pool: &[SubtitleEvent] = if golden.len() >= self.count {
            &golden
        } else {
            info!("Not enough golden events, drawing from all {} events", events.len());
            events
        };

        let mut indices: Vec<usize> = (0..pool.len()).collect();
        indices.shuffle(rng);

        let points: Vec<f64> = indices
            .into_iter()
            .take(self.count)
            .map(|idx| {
                let event = pool[idx];
                let span = event.duration();
                let point = event.start_time + span * 0.1 + rng.random::<f64>() * (span * 0.8);
                info!(
                    "Picked cue [{:.2}s - {:.2}s] -> {:.2}s",
                    event.start_time, event.end_time, point
                );
                point.clamp(0.0, duration)
            })
            .collect();

        if points.len() < self.count {
            warn!("Subtitle selection produced {} points, using fixed percentages", points.len());
            return self.fallback_points(duration);
        }
        points
    }
}
