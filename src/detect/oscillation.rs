//! Path-oscillation detection: pacing back and forth between two spots.

use crate::model::{Evidence, Point, StuckKind, Verdict};
use crate::signals::SignalBuffer;

use super::Thresholds;

/// Reports `PathOscillation` when the recent window bounces between
/// exactly two clusters.
///
/// The window's samples must all land within the cluster radius of one of
/// two centers, each cluster visited at least three times, with at least
/// three alternations between them. A third cluster means the agent is
/// actually going somewhere. Confidence is `alternations / (window - 1)`.
#[must_use]
pub fn detect_oscillation(buffer: &SignalBuffer, thresholds: &Thresholds) -> Option<Verdict> {
    let window = thresholds.oscillation_window;
    let samples = buffer.positions();
    if samples.len() < window || window < 2 {
        return None;
    }

    let recent: Vec<Point> = samples
        .iter()
        .skip(samples.len() - window)
        .map(|s| s.point)
        .collect();

    let center_a = recent[0];
    let mut center_b: Option<Point> = None;
    let mut labels = Vec::with_capacity(window);
    for point in &recent {
        if point.distance(center_a) <= thresholds.cluster_radius {
            labels.push(0u8);
        } else {
            match center_b {
                None => {
                    center_b = Some(*point);
                    labels.push(1);
                }
                Some(b) if point.distance(b) <= thresholds.cluster_radius => labels.push(1),
                // A third distinct spot: not an oscillation.
                Some(_) => return None,
            }
        }
    }
    center_b?;

    let visits_a = labels.iter().filter(|&&l| l == 0).count();
    let visits_b = labels.len() - visits_a;
    let alternations = labels.windows(2).filter(|pair| pair[0] != pair[1]).count();
    if visits_a < 3 || visits_b < 3 || alternations < 3 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let confidence = (alternations as f64 / (window - 1) as f64).min(1.0);
    Some(Verdict {
        kind: StuckKind::PathOscillation,
        confidence,
        evidence: Evidence::Oscillation {
            alternations: u32::try_from(alternations).unwrap_or(u32::MAX),
            window,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    fn at(secs: i64) -> Timestamp {
        Timestamp::new(secs, 0).unwrap()
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            position_window: 10,
            ..Thresholds::default()
        }
    }

    #[test]
    fn alternating_between_two_spots_fires() {
        let mut buffer = SignalBuffer::new(10, 30, 1.0);
        for i in 0..6i64 {
            let x = if i % 2 == 0 { 0.0 } else { 20.0 };
            buffer.record_position(x, 0.0, at(i)).unwrap();
        }

        let verdict = detect_oscillation(&buffer, &thresholds()).unwrap();
        assert_eq!(verdict.kind, StuckKind::PathOscillation);
        assert!(verdict.confidence >= 0.5, "got {}", verdict.confidence);
    }

    #[test]
    fn a_third_cluster_stays_silent() {
        let mut buffer = SignalBuffer::new(10, 30, 1.0);
        let xs = [0.0, 20.0, 0.0, 20.0, 50.0, 0.0];
        for (i, x) in xs.iter().enumerate() {
            buffer.record_position(*x, 0.0, at(i as i64)).unwrap();
        }

        assert!(detect_oscillation(&buffer, &thresholds()).is_none());
    }

    #[test]
    fn one_way_travel_stays_silent() {
        let mut buffer = SignalBuffer::new(10, 30, 1.0);
        let xs = [0.0, 0.0, 0.0, 20.0, 20.0, 20.0];
        for (i, x) in xs.iter().enumerate() {
            buffer.record_position(*x, 0.0, at(i as i64)).unwrap();
        }

        // Both clusters get three visits but only one crossing.
        assert!(detect_oscillation(&buffer, &thresholds()).is_none());
    }

    #[test]
    fn standing_still_stays_silent() {
        let mut buffer = SignalBuffer::new(10, 30, 1.0);
        for i in 0..6 {
            buffer.record_position(5.0, 5.0, at(i)).unwrap();
        }

        assert!(detect_oscillation(&buffer, &thresholds()).is_none());
    }
}
