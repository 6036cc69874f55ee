//! Bank of Korea ECOS data fetcher
//!
//! Korea Treasury Bond 10Y daily yield: table `817Y002` (market rates,
//! daily), item `010210000`.
//!
//! ECOS reports errors inside a 200 response as `{"RESULT": {...}}`.
//! `INFO-200` means "no data for the query" and is not a failure.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::{DateRange, RateError, RatePoint, RateResult};

use super::provider::{finish_series, get_text, http_client, parse_value};

const SOURCE_ID: &str = "ECOS";
const STAT_CODE: &str = "817Y002";
const ITEM_CODE: &str = "010210000";
const NO_DATA_CODE: &str = "INFO-200";

/// ECOS API client
pub struct EcosClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl EcosClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> RateResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: "https://ecos.bok.or.kr/api".to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Daily KTB 10Y yields in `range`
    pub fn fetch_range(&self, range: DateRange) -> RateResult<Vec<RatePoint>> {
        if self.api_key.is_empty() {
            return Err(RateError::config("ECOS_API_KEY is not set"));
        }

        // Row paging is 1-based and inclusive; one row per calendar day is an upper bound
        let max_rows = range.num_days().max(1);
        let url = format!(
            "{}/StatisticSearch/{}/json/kr/1/{}/{}/D/{}/{}/{}",
            self.base_url,
            self.api_key,
            max_rows,
            STAT_CODE,
            range.start.format("%Y%m%d"),
            range.end.format("%Y%m%d"),
            ITEM_CODE
        );

        let body = get_text(&self.client, SOURCE_ID, &url, &[])?;
        let points = parse_statistic_search(&body)?;

        tracing::info!(
            "Fetched {} KTB 10Y observations ({} to {})",
            points.len(),
            range.start,
            range.end
        );
        Ok(points)
    }
}

/// Decode an ECOS `StatisticSearch` body
pub fn parse_statistic_search(body: &str) -> RateResult<Vec<RatePoint>> {
    let response: EcosResponse = serde_json::from_str(body)
        .map_err(|e| RateError::format(SOURCE_ID, format!("Failed to parse response: {}", e)))?;

    let search = match (response.statistic_search, response.result) {
        (Some(search), _) => search,
        (None, Some(result)) if result.code == NO_DATA_CODE => return Ok(Vec::new()),
        (None, Some(result)) => {
            return Err(RateError::unavailable(
                SOURCE_ID,
                format!("{}: {}", result.code, result.message),
            ))
        }
        (None, None) => {
            return Err(RateError::format(SOURCE_ID, "neither StatisticSearch nor RESULT present"))
        }
    };

    let mut points = Vec::with_capacity(search.row.len());
    for row in search.row {
        let date = NaiveDate::parse_from_str(&row.time, "%Y%m%d")
            .map_err(|_| RateError::format(SOURCE_ID, format!("bad TIME {:?}", row.time)))?;
        if let Some(value) = parse_value(SOURCE_ID, &row.data_value)? {
            points.push(RatePoint { date, value });
        }
    }

    finish_series(SOURCE_ID, points)
}

// ECOS API response structures

#[derive(Debug, Deserialize)]
struct EcosResponse {
    #[serde(rename = "StatisticSearch")]
    statistic_search: Option<EcosStatisticSearch>,
    #[serde(rename = "RESULT")]
    result: Option<EcosResult>,
}

#[derive(Debug, Deserialize)]
struct EcosStatisticSearch {
    #[serde(default)]
    row: Vec<EcosRow>,
}

#[derive(Debug, Deserialize)]
struct EcosRow {
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "DATA_VALUE")]
    data_value: String,
}

#[derive(Debug, Deserialize)]
struct EcosResult {
    #[serde(rename = "CODE")]
    code: String,
    #[serde(rename = "MESSAGE", default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let body = r#"{"StatisticSearch":{"list_total_count":2,"row":[
            {"STAT_CODE":"817Y002","ITEM_CODE1":"010210000","TIME":"20240703","DATA_VALUE":"3.175"},
            {"STAT_CODE":"817Y002","ITEM_CODE1":"010210000","TIME":"20240702","DATA_VALUE":"3.201"}
        ]}}"#;

        let points = parse_statistic_search(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
        assert_eq!(points[1].value, 3.175);
    }

    #[test]
    fn test_no_data_result_is_empty() {
        let body = r#"{"RESULT":{"CODE":"INFO-200","MESSAGE":"해당하는 데이터가 없습니다."}}"#;
        assert!(parse_statistic_search(body).unwrap().is_empty());
    }

    #[test]
    fn test_error_result_is_unavailable() {
        let body = r#"{"RESULT":{"CODE":"ERROR-602","MESSAGE":"과도한 OpenAPI호출로 이용이 제한되었습니다."}}"#;
        assert!(matches!(
            parse_statistic_search(body),
            Err(RateError::UpstreamUnavailable { .. })
        ));
    }

    #[test]
    fn test_unexpected_shape_is_format_error() {
        assert!(matches!(
            parse_statistic_search("{}"),
            Err(RateError::UpstreamFormat { .. })
        ));
        assert!(matches!(
            parse_statistic_search("not json"),
            Err(RateError::UpstreamFormat { .. })
        ));
    }
}
