//! Bandwidth estimation and quality selection.

pub mod estimator;
pub mod selector;

pub use estimator::{
    BandwidthEstimator, BandwidthHistory, BandwidthSample, ConditionThresholds, NetworkCondition,
    DEFAULT_ESTIMATE_BPS,
};
pub use selector::RepresentationSelector;
