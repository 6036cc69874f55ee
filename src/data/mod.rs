//! Data fetching and caching
//!
//! Handles:
//! - FRED API for the US 10Y yield
//! - Bank of Korea ECOS API for the KR 10Y yield
//! - DART filings for insurer balance sheets
//! - In-memory TTL caching of computed payloads

pub mod cache;
pub mod dart;
pub mod ecos;
pub mod fred;
pub mod provider;

pub use cache::*;
pub use dart::{find_company, Company, DartClient, EquityProvider, COMPANIES};
pub use ecos::EcosClient;
pub use fred::FredClient;
pub use provider::{MarketDataClient, RateProvider};
