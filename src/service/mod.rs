//! Request-level services
//!
//! - [`AggregationService`]: rate, spread and correlation payloads
//! - [`InsurerAnalysisService`]: insurer equity duration analysis
//!
//! Both return serialized JSON from the shared [`PayloadCache`](crate::data::PayloadCache)
//! when fresh and typed payloads for in-process callers.

pub mod aggregation;
pub mod insurer;
pub mod payload;

pub use aggregation::AggregationService;
pub use insurer::InsurerAnalysisService;
pub use payload::*;
