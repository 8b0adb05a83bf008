//! HTTP client for the statistics backend.
//!
//! Every endpoint answers `{success, data, error?}`. The client unwraps that
//! envelope and maps each failure to one [`ApiError`] variant, so callers can
//! tell transport failures from bad or unsuccessful responses.

use crate::api::error::{ApiError, ApiResult};
use crate::metric::Metric;
use crate::models::{
    ApiEnvelope, County, CountyDetail, CropRow, Interview, MetricRow, Overview, YearlyRow,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Inclusive year range for time-series endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    fn query(&self) -> [(&'static str, String); 2] {
        [
            ("start_year", self.start.to_string()),
            ("end_year", self.end.to_string()),
        ]
    }
}

/// Filters for `/counties`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountyFilters {
    pub region: Option<String>,
    pub province: Option<String>,
}

/// Query for `/interviews`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterviewQuery {
    pub county_code: Option<String>,
    pub surveyor_id: Option<String>,
    pub keyword: Option<String>,
    pub limit: usize,
}

/// Typed client for the statistics REST API.
#[derive(Debug, Clone)]
pub struct StatsClient {
    base_url: String,
    http: reqwest::Client,
}

impl StatsClient {
    /// Create a client with its own connection pool.
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self::with_http_client(base_url, http))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn overview(&self) -> ApiResult<Overview> {
        self.get("/stats/overview", &[]).await
    }

    pub async fn counties(&self, filters: &CountyFilters) -> ApiResult<Vec<County>> {
        let mut query = Vec::new();
        push_opt(&mut query, "region", &filters.region);
        push_opt(&mut query, "province", &filters.province);
        self.get("/counties", &query).await
    }

    pub async fn county(&self, code: &str) -> ApiResult<CountyDetail> {
        self.get(&format!("/counties/{}", code), &[]).await
    }

    pub async fn economy(&self, code: &str, range: YearRange) -> ApiResult<Vec<YearlyRow>> {
        self.get(&format!("/counties/{}/economy", code), &range.query())
            .await
    }

    pub async fn agriculture(&self, code: &str, range: YearRange) -> ApiResult<Vec<YearlyRow>> {
        self.get(&format!("/counties/{}/agriculture", code), &range.query())
            .await
    }

    pub async fn crops(&self, code: &str, year: i32) -> ApiResult<Vec<CropRow>> {
        self.get(
            &format!("/counties/{}/crops", code),
            &[("year", year.to_string())],
        )
        .await
    }

    pub async fn interviews(&self, query: &InterviewQuery) -> ApiResult<Vec<Interview>> {
        let mut params = Vec::new();
        push_opt(&mut params, "county_code", &query.county_code);
        push_opt(&mut params, "surveyor_id", &query.surveyor_id);
        push_opt(&mut params, "keyword", &query.keyword);
        params.push(("limit", query.limit.to_string()));
        self.get("/interviews", &params).await
    }

    /// Multi-county yearly rows for one metric.
    pub async fn compare_trend(
        &self,
        codes: &[String],
        metric: Metric,
        range: YearRange,
    ) -> ApiResult<Vec<MetricRow>> {
        let mut params: Vec<(&str, String)> =
            codes.iter().map(|c| ("county_code", c.clone())).collect();
        params.push(("metric", metric.api_name().to_string()));
        params.extend(range.query());
        self.get("/compare/trend", &params).await
    }

    /// GET `path` and unwrap the response envelope.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<Value>>(&body)
                .ok()
                .and_then(|env| env.error)
                .unwrap_or(body);
            warn!("{} returned {}", url, status);
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<Value> =
            serde_json::from_str(&body).map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?;

        if !envelope.success {
            return Err(ApiError::Unsuccessful {
                url,
                message: envelope
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        serde_json::from_value(envelope.data.unwrap_or(Value::Null))
            .map_err(|source| ApiError::Decode { url, source })
    }
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        query.push((key, v.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dead_base_url, serve_routes, test_client, Route};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_compare_trend_query_and_decode() {
        let server = serve_routes(vec![Route::ok(
            "/api/compare/trend",
            json!({
                "success": true,
                "count": 2,
                "data": [
                    {"CountyCode": "A", "CountyName": "Alpha", "Year": 2010, "GDP": 100.0},
                    {"CountyCode": "B", "CountyName": "Beta", "Year": 2010, "GDP": null}
                ]
            }),
        )])
        .await;
        let client = test_client(&server.base_url);

        let rows = assert_ok!(
            client
                .compare_trend(
                    &["A".to_string(), "B".to_string()],
                    Metric::Gdp,
                    YearRange::new(2010, 2020),
                )
                .await
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value(Metric::Gdp), Some(100.0));
        assert_eq!(rows[1].value(Metric::Gdp), None);

        let requests = server.requests.lock().unwrap().clone();
        let request_line = &requests[0];
        assert!(request_line.starts_with("GET /api/compare/trend?"));
        assert!(request_line.contains("county_code=A&county_code=B"));
        assert!(request_line.contains("metric=GDP"));
        assert!(request_line.contains("start_year=2010"));
        assert!(request_line.contains("end_year=2020"));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope() {
        let server = serve_routes(vec![Route::ok(
            "/api/stats/overview",
            json!({"success": false, "error": "bad metric"}),
        )])
        .await;

        let err = test_client(&server.base_url).overview().await.unwrap_err();
        match err {
            ApiError::Unsuccessful { message, .. } => assert_eq!(message, "bad metric"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_status_carries_backend_message() {
        let server = serve_routes(vec![Route::status(
            "/api/counties/000000",
            "404 Not Found",
            json!({"success": false, "error": "县代码不存在"}),
        )])
        .await;

        let err = test_client(&server.base_url)
            .county("000000")
            .await
            .unwrap_err();
        match err {
            ApiError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "县代码不存在");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = serve_routes(vec![Route {
            path: "/api/counties",
            status: "200 OK",
            body: "<html>oops</html>".to_string(),
        }])
        .await;

        let err = test_client(&server.base_url)
            .counties(&CountyFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let base = dead_base_url().await;
        let err = assert_err!(test_client(&base).overview().await);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_blank_filters_are_omitted() {
        let server = serve_routes(vec![Route::ok(
            "/api/interviews",
            json!({"success": true, "data": []}),
        )])
        .await;
        let query = InterviewQuery {
            county_code: Some("  ".to_string()),
            surveyor_id: None,
            keyword: Some("养殖".to_string()),
            limit: 20,
        };

        let interviews = test_client(&server.base_url)
            .interviews(&query)
            .await
            .unwrap();
        assert!(interviews.is_empty());

        let requests = server.requests.lock().unwrap().clone();
        assert!(!requests[0].contains("county_code"));
        assert!(!requests[0].contains("surveyor_id"));
        assert!(requests[0].contains("keyword="));
        assert!(requests[0].contains("limit=20"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = StatsClient::new("http://localhost:5001/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001/api");
    }
}
