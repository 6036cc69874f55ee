//! DART (금융감독원 전자공시) insurer balance sheet fetcher
//!
//! Pulls total equity, assets and liabilities from the single-company key
//! accounts endpoint (`fnlttSinglAcnt.json`) for each quarterly filing.
//! Only separate (OFS) statements are used.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::analytics::EquityObservation;
use crate::core::{RateError, RateResult};

use super::provider::{get_text, http_client};

const SOURCE_ID: &str = "DART";
const STATUS_OK: &str = "000";
const STATUS_NO_DATA: &str = "013";

/// Insurer covered by the duration analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Company {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub corp_code: &'static str,
}

/// Supported life insurers
pub const COMPANIES: [Company; 4] = [
    Company { id: "samsung", name: "삼성생명", corp_code: "00126256" },
    Company { id: "hanwha", name: "한화생명", corp_code: "00113058" },
    Company { id: "kyobo", name: "교보생명", corp_code: "00112882" },
    Company { id: "shinhan", name: "신한생명", corp_code: "00137517" },
];

/// Look up a company by its short id
pub fn find_company(id: &str) -> Option<&'static Company> {
    COMPANIES.iter().find(|c| c.id == id)
}

/// Report codes in filing order: Q1, half-year, Q3, annual
const REPORTS: [(&str, u32, u32, &str); 4] = [
    ("11013", 3, 31, "1Q"),
    ("11012", 6, 30, "2Q"),
    ("11014", 9, 30, "3Q"),
    ("11011", 12, 31, "4Q"),
];

/// Source of quarterly balance sheets
pub trait EquityProvider: Send + Sync {
    /// Most recent `year_count * 4` quarters up to `today`, ascending
    fn fetch_equity(&self, company: &Company, year_count: u32, today: NaiveDate) -> RateResult<Vec<EquityObservation>>;
}

/// DART API client
pub struct DartClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl DartClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> RateResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: "https://opendart.fss.or.kr/api".to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Key accounts for one filing
    fn fetch_filing(
        &self,
        company: &Company,
        year: i32,
        reprt_code: &str,
        quarter_end: NaiveDate,
    ) -> RateResult<Option<EquityObservation>> {
        let url = format!("{}/fnlttSinglAcnt.json", self.base_url);
        let query = [
            ("crtfc_key", self.api_key.clone()),
            ("corp_code", company.corp_code.to_string()),
            ("bsns_year", year.to_string()),
            ("reprt_code", reprt_code.to_string()),
        ];
        let body = get_text(&self.client, SOURCE_ID, &url, &query)?;
        parse_key_accounts(&body, quarter_end)
    }
}

impl EquityProvider for DartClient {
    fn fetch_equity(&self, company: &Company, year_count: u32, today: NaiveDate) -> RateResult<Vec<EquityObservation>> {
        if self.api_key.is_empty() {
            return Err(RateError::config("DART_API_KEY is not set"));
        }

        let current_year = today.year();
        let first_year = current_year - year_count as i32;
        let mut quarters = Vec::new();

        for year in first_year..=current_year {
            for (reprt_code, month, day, label) in REPORTS {
                let quarter_end = match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(d) if d <= today => d,
                    _ => continue,
                };

                match self.fetch_filing(company, year, reprt_code, quarter_end) {
                    Ok(Some(obs)) => quarters.push(obs),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("DART lookup failed for {} {} {}: {}", company.id, year, label, e);
                    }
                }
            }
        }

        let result = latest_quarters(quarters, year_count);
        if result.is_empty() {
            return Err(RateError::no_data(format!("No equity filings found for {}", company.id)));
        }

        tracing::info!("Fetched {} quarters of DART data for {}", result.len(), company.id);
        Ok(result)
    }
}

/// Deduplicate by quarter, sort ascending and keep the last `year_count * 4`
pub fn latest_quarters(quarters: Vec<EquityObservation>, year_count: u32) -> Vec<EquityObservation> {
    let by_quarter: BTreeMap<NaiveDate, EquityObservation> = quarters
        .into_iter()
        .rev()
        .map(|obs| (obs.quarter, obs))
        .collect();

    let keep = year_count as usize * 4;
    let skip = by_quarter.len().saturating_sub(keep);
    by_quarter.into_values().skip(skip).collect()
}

/// Decode a `fnlttSinglAcnt.json` body into a quarter observation.
///
/// Returns `Ok(None)` when the filing does not exist yet or carries no
/// separate-statement equity line.
pub fn parse_key_accounts(body: &str, quarter_end: NaiveDate) -> RateResult<Option<EquityObservation>> {
    let response: DartResponse = serde_json::from_str(body)
        .map_err(|e| RateError::format(SOURCE_ID, format!("Failed to parse accounts: {}", e)))?;

    match response.status.as_str() {
        STATUS_OK => {}
        STATUS_NO_DATA => return Ok(None),
        other => {
            return Err(RateError::unavailable(
                SOURCE_ID,
                format!("status {}: {}", other, response.message),
            ))
        }
    }

    let mut equity = None;
    let mut asset = None;
    let mut liability = None;

    for item in response.list.iter().filter(|item| item.fs_div == "OFS") {
        let amount = match parse_amount(&item.thstrm_amount)? {
            Some(a) => a,
            None => continue,
        };
        match account_kind(&item.account_nm) {
            Some(Account::Equity) => equity = Some(amount),
            Some(Account::Asset) => asset = Some(amount),
            Some(Account::Liability) => liability = Some(amount),
            None => {}
        }
    }

    Ok(equity.map(|equity| EquityObservation {
        quarter: quarter_end,
        equity,
        asset,
        liability,
    }))
}

enum Account {
    Equity,
    Asset,
    Liability,
}

fn account_kind(name: &str) -> Option<Account> {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("자본총계") {
        Some(Account::Equity)
    } else if compact.contains("자산총계") {
        Some(Account::Asset)
    } else if compact.contains("부채총계") {
        Some(Account::Liability)
    } else {
        None
    }
}

fn parse_amount(raw: &str) -> RateResult<Option<i64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(None);
    }
    trimmed
        .replace(',', "")
        .parse()
        .map(Some)
        .map_err(|_| RateError::format(SOURCE_ID, format!("unparsable amount {:?}", raw)))
}

// DART API response structures

#[derive(Debug, Deserialize)]
struct DartResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    list: Vec<DartAccount>,
}

#[derive(Debug, Deserialize)]
struct DartAccount {
    #[serde(default)]
    account_nm: String,
    #[serde(default)]
    fs_div: String,
    #[serde(default)]
    thstrm_amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_key_accounts_uses_separate_statements() {
        let body = r#"{"status":"000","message":"정상","list":[
            {"account_nm":"자본총계","fs_div":"CFS","thstrm_amount":"99,000,000,000,000"},
            {"account_nm":"자본총계","fs_div":"OFS","thstrm_amount":"12,345,678,900,000"},
            {"account_nm":"자산 총계","fs_div":"OFS","thstrm_amount":"300,000,000,000,000"},
            {"account_nm":"부채총계","fs_div":"OFS","thstrm_amount":"-"}
        ]}"#;

        let obs = parse_key_accounts(body, q(2024, 3, 31)).unwrap().unwrap();
        assert_eq!(obs.equity, 12_345_678_900_000);
        assert_eq!(obs.asset, Some(300_000_000_000_000));
        assert_eq!(obs.liability, None);
        assert_eq!(obs.quarter, q(2024, 3, 31));
    }

    #[test]
    fn test_missing_filing_is_none() {
        let body = r#"{"status":"013","message":"조회된 데이타가 없습니다."}"#;
        assert_eq!(parse_key_accounts(body, q(2024, 6, 30)).unwrap(), None);
    }

    #[test]
    fn test_error_status_is_unavailable() {
        let body = r#"{"status":"010","message":"등록되지 않은 키입니다."}"#;
        assert!(matches!(
            parse_key_accounts(body, q(2024, 6, 30)),
            Err(RateError::UpstreamUnavailable { .. })
        ));
    }

    #[test]
    fn test_latest_quarters_dedups_and_trims() {
        let obs = |quarter, equity| EquityObservation {
            quarter,
            equity,
            asset: None,
            liability: None,
        };
        let quarters = vec![
            obs(q(2023, 3, 31), 1),
            obs(q(2023, 6, 30), 2),
            obs(q(2023, 6, 30), 20),
            obs(q(2023, 9, 30), 3),
            obs(q(2023, 12, 31), 4),
            obs(q(2024, 3, 31), 5),
        ];

        let kept = latest_quarters(quarters, 1);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept[0].quarter, q(2023, 6, 30));
        // first occurrence wins
        assert_eq!(kept[0].equity, 2);
        assert_eq!(kept[3].quarter, q(2024, 3, 31));
    }

    #[test]
    fn test_company_lookup() {
        assert_eq!(find_company("kyobo").unwrap().name, "교보생명");
        assert!(find_company("unknown").is_none());
    }
}
