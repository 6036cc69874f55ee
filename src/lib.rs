//! # Rate Monitor - US/KR 10Y Yield Spread Dashboard Backend
//!
//! Fetches the US 10-year Treasury yield (FRED) and the Korean 10-year
//! government bond yield (Bank of Korea ECOS), aligns the two daily series
//! across their different holiday calendars and derives:
//!
//! - **Spread**: KR minus US, in basis points
//! - **Rolling correlation**: Pearson correlation over calendar-day windows
//! - **Latest quotes** and a bounded numeric context for a summarizer
//! - **Insurer duration**: sensitivity of life insurers' book equity to
//!   quarter-end rate moves, from DART filings
//!
//! Results are cached in memory with per-payload TTLs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rate_monitor::prelude::*;
//!
//! let config = MonitorConfig::from_env();
//! let provider = MarketDataClient::from_config(&config.providers).unwrap();
//! let cache = Arc::new(PayloadCache::new(config.cache.stale_grace_secs));
//! let service = AggregationService::new(Arc::new(provider), cache, config);
//!
//! let rates = service.get_rates(90).unwrap();
//! println!("{} rows, latest spread {:?}", rates.count, rates.spread);
//! ```
//!
//! ## What This Does NOT Do
//!
//! - Persist anything across restarts
//! - Forecast rates or generate trading signals
//! - Render charts

pub mod analytics;
pub mod config;
pub mod core;
pub mod data;
pub mod service;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        AlignedRow, AlignedSeries, CorrelationWindow, DateRange, RateError, RatePoint,
        RateResult, RateSource, SpreadPoint,
    };

    // Configuration
    pub use crate::config::MonitorConfig;

    // Data fetching and caching
    pub use crate::data::{
        Clock, DartClient, EcosClient, EquityProvider, FredClient, MarketDataClient,
        PayloadCache, RateProvider, SystemClock,
    };

    // Analytics
    pub use crate::analytics::{align, calculate_duration, merge_with_gaps, EquityObservation};

    // Services
    pub use crate::service::{
        AggregationService, ApiResponse, CorrelationPayload, InsurerAnalysis,
        InsurerAnalysisService, RatesPayload,
    };
}

// Re-export main types at crate root
pub use crate::core::{RateError, RateResult};
pub use crate::service::{AggregationService, InsurerAnalysisService};
