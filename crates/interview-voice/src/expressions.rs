//! Session-long facial-expression aggregation.

use std::sync::Mutex;

use interview_core::{Emotion, ExpressionAverages, ExpressionFrame};
use tracing::debug;

#[derive(Default)]
struct Samples {
    sums: [f64; 7],
    count: u64,
}

/// Buffers per-frame samples and reduces them to per-emotion means on demand.
///
/// Sampling cadence belongs to the caller. Reading the averages drains the buffer, so each call
/// covers only the samples pushed since the previous one.
#[derive(Default)]
pub struct ExpressionAggregator {
    samples: Mutex<Samples>,
}

impl ExpressionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample. Values are clamped to `[0, 1]`; NaN counts as 0.
    pub fn push(&self, frame: ExpressionFrame) {
        let mut samples = self.lock();
        for emotion in Emotion::ALL {
            let value = frame.get(emotion);
            let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            samples.sums[emotion.index()] += f64::from(value);
        }
        samples.count += 1;
    }

    pub fn sample_count(&self) -> u64 {
        self.lock().count
    }

    /// Per-emotion mean over the buffered samples (all zero when empty), then clear.
    pub fn get_average_expressions(&self) -> ExpressionAverages {
        let drained = std::mem::take(&mut *self.lock());
        let mut frame = ExpressionFrame::default();
        if drained.count > 0 {
            for emotion in Emotion::ALL {
                frame.set(emotion, (drained.sums[emotion.index()] / drained.count as f64) as f32);
            }
        }
        debug!(samples = drained.count, "expression averages computed");
        ExpressionAverages(frame)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Samples> {
        self.samples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(happy: f32, neutral: f32) -> ExpressionFrame {
        ExpressionFrame {
            happy,
            neutral,
            ..Default::default()
        }
    }

    #[test]
    fn averages_then_clears() {
        let agg = ExpressionAggregator::new();
        agg.push(frame(1.0, 0.0));
        agg.push(frame(0.5, 0.5));

        let avg = agg.get_average_expressions();
        assert!((avg.get(Emotion::Happy) - 0.75).abs() < 1e-6);
        assert!((avg.get(Emotion::Neutral) - 0.25).abs() < 1e-6);
        assert_eq!(avg.get(Emotion::Sad), 0.0);

        let second = agg.get_average_expressions();
        assert!(second.is_zero());
        assert_eq!(agg.sample_count(), 0);
    }

    #[test]
    fn empty_is_all_zero() {
        assert!(ExpressionAggregator::new().get_average_expressions().is_zero());
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let agg = ExpressionAggregator::new();
        agg.push(frame(3.0, -1.0));
        agg.push(frame(f32::NAN, 1.0));

        let avg = agg.get_average_expressions();
        assert!((avg.get(Emotion::Happy) - 0.5).abs() < 1e-6);
        assert!((avg.get(Emotion::Neutral) - 0.5).abs() < 1e-6);
    }
}
