//! Polygon.io market-data client
//!
//! Thin wrapper over the REST endpoints the tools need. Each call returns
//! the `results` payload of a successful response.

use super::{AggregatesInput, MarketDataSource};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Reusable Polygon client (connection-pooled)
#[derive(Clone)]
pub struct PolygonClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PolygonClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        Self::new(
            config.polygon_api_key.clone(),
            config.polygon_base_url.clone(),
            config.http_timeout,
        )
    }

    async fn get_results(
        &self,
        path: &str,
        params: &[(&str, String)],
        accepted: &[&str],
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "Calling Polygon API");

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                error!("Polygon request failed for {}: {}", path, e);
                AdvisorError::ToolError(format!("Polygon request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::ToolError(format!(
                "Polygon returned {} for {}: {}",
                status, path, body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AdvisorError::ToolError(format!("Invalid JSON from Polygon: {}", e)))?;

        extract_results(body, accepted)
    }
}

/// Accept the body only when its `status` is one of `accepted`.
fn extract_results(mut body: Value, accepted: &[&str]) -> Result<Value> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
    if !accepted.iter().any(|ok| *ok == status) {
        return Err(AdvisorError::ToolError(format!("Polygon API error: {}", body)));
    }

    Ok(match body.get_mut("results") {
        Some(results) => results.take(),
        None => Value::Array(Vec::new()),
    })
}

const OK: &[&str] = &["OK"];

#[async_trait::async_trait]
impl MarketDataSource for PolygonClient {
    async fn last_quote(&self, ticker: &str) -> Result<Value> {
        self.get_results(&format!("/v2/last/nbbo/{}", ticker), &[], OK)
            .await
    }

    async fn ticker_news(&self, ticker: &str) -> Result<Value> {
        self.get_results(
            "/v2/reference/news",
            &[("ticker", ticker.to_string())],
            OK,
        )
        .await
    }

    async fn financials(&self, ticker: &str) -> Result<Value> {
        self.get_results(
            "/vX/reference/financials",
            &[("ticker", ticker.to_string())],
            OK,
        )
        .await
    }

    async fn aggregates(&self, input: &AggregatesInput) -> Result<Value> {
        let path = format!(
            "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            input.ticker,
            input.timespan_multiplier,
            input.timespan.as_str(),
            input.from_date.format("%Y-%m-%d"),
            input.to_date.format("%Y-%m-%d"),
        );

        self.get_results(
            &path,
            &[
                ("adjusted", "true".to_string()),
                ("sort", "asc".to_string()),
                ("limit", "5000".to_string()),
            ],
            &["OK", "DELAYED"],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Timespan;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PolygonClient {
        PolygonClient::new(
            "pg-test".to_string(),
            format!("{}/", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_results_rejects_error_status() {
        let err = extract_results(json!({ "status": "ERROR", "error": "bad key" }), OK);
        assert!(matches!(err, Err(AdvisorError::ToolError(msg)) if msg.contains("bad key")));

        let missing = extract_results(json!({ "status": "OK" }), OK).unwrap();
        assert_eq!(missing, json!([]));
    }

    #[tokio::test]
    async fn test_last_quote_returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/last/nbbo/ACME"))
            .and(query_param("apiKey", "pg-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": { "T": "ACME", "P": 10.0 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote = client_for(&server).last_quote("ACME").await.unwrap();
        assert_eq!(quote["P"], 10.0);
    }

    #[tokio::test]
    async fn test_news_passes_ticker_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/reference/news"))
            .and(query_param("ticker", "MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{ "title": "Earnings" }]
            })))
            .mount(&server)
            .await;

        let news = client_for(&server).ticker_news("MSFT").await.unwrap();
        assert_eq!(news[0]["title"], "Earnings");
    }

    #[tokio::test]
    async fn test_aggregates_accepts_delayed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/aggs/ticker/AAPL/range/1/day/2024-01-02/2024-01-05"))
            .and(query_param("sort", "asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "DELAYED",
                "results": [{ "o": 185.0, "c": 186.5 }]
            })))
            .mount(&server)
            .await;

        let input = AggregatesInput {
            ticker: "AAPL".to_string(),
            timespan: Timespan::Day,
            timespan_multiplier: 1,
            from_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };

        let bars = client_for(&server).aggregates(&input).await.unwrap();
        assert_eq!(bars.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_http_error_is_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vX/reference/financials"))
            .respond_with(ResponseTemplate::new(403).set_body_string("NOT_AUTHORIZED"))
            .mount(&server)
            .await;

        let result = client_for(&server).financials("ACME").await;
        assert!(matches!(result, Err(AdvisorError::ToolError(msg)) if msg.contains("403")));
    }
}
