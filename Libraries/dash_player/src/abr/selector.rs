use crate::abr::{BandwidthEstimator, NetworkCondition};
use crate::mpd::QualityLadder;

/// Maps the estimator's condition onto a rung of the quality ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepresentationSelector;

impl RepresentationSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, ladder: &QualityLadder, estimator: &BandwidthEstimator) -> usize {
        Self::index_for(estimator.condition(), ladder.len())
    }

    /// Poor picks the lowest rung, moderate the middle one and good the highest.
    pub fn index_for(condition: NetworkCondition, ladder_len: usize) -> usize {
        let highest = ladder_len.saturating_sub(1);
        let index = match condition {
            NetworkCondition::Poor => 0,
            NetworkCondition::Moderate => ladder_len / 2,
            NetworkCondition::Good => highest,
        };
        index.min(highest)
    }

    /// Unconditional one-step backoff used after a failed segment.
    pub fn downgrade(&self, current: usize) -> usize {
        current.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abr::{BandwidthSample, ConditionThresholds};
    use crate::mpd::Representation;

    fn ladder(bandwidths: &[u64]) -> QualityLadder {
        let reps = bandwidths
            .iter()
            .enumerate()
            .map(|(i, &bandwidth)| Representation { id: format!("r{}", i), bandwidth, ..Default::default() })
            .collect();
        QualityLadder::new("v".into(), vec![], reps)
    }

    fn estimator_at(bps: f64) -> BandwidthEstimator {
        let mut estimator = BandwidthEstimator::new(3, ConditionThresholds::default());
        estimator.record(BandwidthSample { bits_per_second: bps, elapsed_seconds: 1.0 });
        estimator
    }

    #[test]
    fn three_rung_ladder_maps_each_condition() {
        let ladder = ladder(&[600_000, 1_200_000, 2_400_000]);
        let selector = RepresentationSelector::new();
        assert_eq!(selector.select(&ladder, &estimator_at(100_000.0)), 0);
        assert_eq!(selector.select(&ladder, &estimator_at(1_000_000.0)), 1);
        assert_eq!(selector.select(&ladder, &estimator_at(9_000_000.0)), 2);
    }

    #[test]
    fn single_rung_always_selects_zero() {
        let ladder = ladder(&[800_000]);
        let selector = RepresentationSelector::new();
        for bps in [0.0, 1_000_000.0, 50_000_000.0] {
            assert_eq!(selector.select(&ladder, &estimator_at(bps)), 0);
        }
    }

    #[test]
    fn selection_is_idempotent_and_in_range() {
        let selector = RepresentationSelector::new();
        for len in 1..=6 {
            let ladder = ladder(&vec![1; len]);
            for bps in [10.0, 1_000_000.0, 10_000_000.0] {
                let estimator = estimator_at(bps);
                let first = selector.select(&ladder, &estimator);
                assert_eq!(first, selector.select(&ladder, &estimator));
                assert!(first < len);
            }
        }
    }

    #[test]
    fn moderate_takes_floor_of_half() {
        assert_eq!(RepresentationSelector::index_for(NetworkCondition::Moderate, 4), 2);
        assert_eq!(RepresentationSelector::index_for(NetworkCondition::Moderate, 5), 2);
        assert_eq!(RepresentationSelector::index_for(NetworkCondition::Moderate, 2), 1);
    }

    #[test]
    fn empty_ladder_clamps_to_zero() {
        assert_eq!(RepresentationSelector::index_for(NetworkCondition::Good, 0), 0);
    }

    #[test]
    fn downgrade_steps_down_and_stops_at_zero() {
        let selector = RepresentationSelector::new();
        assert_eq!(selector.downgrade(2), 1);
        assert_eq!(selector.downgrade(1), 0);
        assert_eq!(selector.downgrade(0), 0);
    }
}
