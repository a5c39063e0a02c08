use std::time::Duration;
use thiserror::Error;

/// Binding and configuration failures of a channel shaper
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaperError {
    #[error("Already bound")]
    AlreadyBound,

    #[error("Weight is out of limits: {0}")]
    WeightOutOfLimits(u32),

    #[error("Aggregation period is out of limits: {0:?}")]
    AggregationPeriodOutOfLimits(Duration),

    #[error("Cannot clone bound channel")]
    CloneBound,

    #[error("Subscription filter of a dynamic shaper cannot be replaced")]
    DynamicFilterReplacement,
}

pub type ShaperResult<T> = Result<T, ShaperError>;
