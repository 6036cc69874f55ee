//! Core data types for the rate monitor
//!
//! Defines fundamental types:
//! - RatePoint / RateSource: raw upstream observations
//! - AlignedSeries: US and KR rates on a common date axis
//! - SpreadPoint, CorrelationWindow: derived metrics

pub mod rate;
pub mod series;
pub mod error;

pub use rate::*;
pub use series::*;
pub use error::*;
