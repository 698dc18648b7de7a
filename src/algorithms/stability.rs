//! Settling detector for ranging positions

use crate::core::{STABILITY_DWELL, STABILITY_THRESHOLD};
use nalgebra::Vector3;
use std::time::{Duration, Instant};

/// Edge-triggered debounce over consecutive ranging positions.
///
/// The dwell timer starts when the displacement between consecutive samples
/// first drops to the threshold and restarts on any larger jump. Once the
/// timer has run for the full dwell the detector signals stop, once per
/// settled episode.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    threshold: f32,
    dwell: Duration,
    last_position: Option<Vector3<f32>>,
    settled_since: Option<Instant>,
    signalled: bool,
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self::new(STABILITY_THRESHOLD, STABILITY_DWELL)
    }
}

impl StabilityDetector {
    pub fn new(threshold: f32, dwell: Duration) -> Self {
        Self {
            threshold,
            dwell,
            last_position: None,
            settled_since: None,
            signalled: false,
        }
    }

    /// Forget all history, used when a new session starts
    pub fn reset(&mut self) {
        self.last_position = None;
        self.settled_since = None;
        self.signalled = false;
    }

    /// Time the current settled run started, if any
    pub fn settled_since(&self) -> Option<Instant> {
        self.settled_since
    }

    /// Feed one position; returns true when ranging should stop
    pub fn update(&mut self, position: Vector3<f32>, at: Instant) -> bool {
        let previous = self.last_position.replace(position);
        let Some(previous) = previous else {
            return false;
        };

        if (position - previous).norm() > self.threshold {
            self.settled_since = None;
            self.signalled = false;
            return false;
        }

        let since = *self.settled_since.get_or_insert(at);
        if self.signalled || at.saturating_duration_since(since) < self.dwell {
            return false;
        }

        self.signalled = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(detector: &mut StabilityDetector, start: Instant, seconds: &[u64], position: Vector3<f32>) -> Vec<bool> {
        seconds
            .iter()
            .map(|s| detector.update(position, start + Duration::from_secs(*s)))
            .collect()
    }

    #[test]
    fn test_first_sample_never_stops() {
        let mut detector = StabilityDetector::default();
        assert!(!detector.update(Vector3::zeros(), Instant::now()));
        assert!(detector.settled_since().is_none());
    }

    #[test]
    fn test_short_dwell_never_stops() {
        let mut detector = StabilityDetector::default();
        let start = Instant::now();
        let results = feed(&mut detector, start, &[0, 1, 5, 10, 15], Vector3::new(1.0, 0.0, 0.0));

        // Timer starts at t=1, so t=15 is only 14 s in
        assert!(results.iter().all(|stop| !stop));
    }

    #[test]
    fn test_full_dwell_stops_once() {
        let mut detector = StabilityDetector::default();
        let start = Instant::now();
        let results = feed(&mut detector, start, &[0, 1, 8, 16, 17, 30], Vector3::new(1.0, 0.0, 0.0));

        assert_eq!(results, vec![false, false, false, true, false, false]);
    }

    #[test]
    fn test_excursion_resets_timer() {
        let mut detector = StabilityDetector::default();
        let start = Instant::now();
        let at = |s: u64| start + Duration::from_secs(s);

        detector.update(Vector3::new(0.0, 0.0, 0.0), at(0));
        detector.update(Vector3::new(0.05, 0.0, 0.0), at(1));
        assert_eq!(detector.settled_since(), Some(at(1)));

        // Jump of 0.5 m
        assert!(!detector.update(Vector3::new(0.55, 0.0, 0.0), at(10)));
        assert!(detector.settled_since().is_none());

        assert!(!detector.update(Vector3::new(0.56, 0.0, 0.0), at(11)));
        assert!(!detector.update(Vector3::new(0.57, 0.0, 0.0), at(20)));
        assert!(detector.update(Vector3::new(0.58, 0.0, 0.0), at(26)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut detector = StabilityDetector::new(0.5, Duration::from_secs(15));
        let start = Instant::now();
        detector.update(Vector3::new(0.0, 0.0, 0.0), start);
        detector.update(Vector3::new(0.5, 0.0, 0.0), start + Duration::from_secs(1));
        assert!(detector.settled_since().is_some());
    }

    #[test]
    fn test_new_episode_after_excursion_signals_again() {
        let mut detector = StabilityDetector::default();
        let start = Instant::now();
        let at = |s: u64| start + Duration::from_secs(s);

        detector.update(Vector3::zeros(), at(0));
        detector.update(Vector3::zeros(), at(1));
        assert!(detector.update(Vector3::zeros(), at(16)));

        detector.update(Vector3::new(2.0, 0.0, 0.0), at(17));
        detector.update(Vector3::new(2.0, 0.0, 0.0), at(18));
        assert!(detector.update(Vector3::new(2.0, 0.0, 0.0), at(33)));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut detector = StabilityDetector::default();
        let start = Instant::now();
        detector.update(Vector3::zeros(), start);
        detector.update(Vector3::zeros(), start + Duration::from_secs(1));
        detector.reset();

        assert!(detector.settled_since().is_none());
        assert!(!detector.update(Vector3::zeros(), start + Duration::from_secs(20)));
    }
}
