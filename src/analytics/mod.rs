//! Derived metrics over aligned rate series
//!
//! Four pure stages, none of which touch the network or the cache:
//! 1. **align**: US/KR onto a common date axis with carry-forward
//! 2. **spread**: KR minus US in basis points
//! 3. **correlation**: rolling and overall Pearson correlation
//! 4. **duration**: insurer equity sensitivity to quarter-end rate moves

pub mod align;
pub mod correlation;
pub mod duration;
pub mod spread;

pub use align::{align, align_in_range, merge_with_gaps};
pub use duration::{calculate_duration, DurationResult, EquityObservation};
