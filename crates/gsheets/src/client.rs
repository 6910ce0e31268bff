//! The Sheets API client.
//!
//! Credential bootstrapping is out of scope; the client is handed a ready
//! bearer token. Reads are retried a bounded number of times on transport
//! and server errors; writes go out exactly once, since a half-applied
//! submission must stay diagnosable rather than be blindly re-driven.

use crate::wire::{format_request, qualified_range, SpreadsheetMeta, ValueRange};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tallysheet_core::{TallyError, TallyResult};
use tallysheet_store::{FormatOp, TabMeta, TabularStore};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Extra attempts for idempotent reads.
const READ_RETRIES: u32 = 2;

/// Google Sheets v4 implementation of [`TabularStore`].
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SheetsClient {
    /// Build a client against the production API.
    pub fn new(token: impl Into<String>) -> TallyResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Build a client against an arbitrary endpoint (tests point this at a
    /// mock server).
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> TallyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .no_proxy()
            .build()
            .map_err(|e| TallyError::Store(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn values_url(&self, doc: &str, tab: &str, range: &str) -> String {
        let range = encode_segment(&qualified_range(tab, range));
        format!("{}/v4/spreadsheets/{doc}/values/{range}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> TallyResult<T> {
        let mut attempt = 0;
        loop {
            match self.try_get(url).await {
                Ok(value) => return Ok(value),
                Err((retryable, err)) => {
                    if !retryable || attempt >= READ_RETRIES {
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::debug!(url, attempt, error = %err, "retrying read");
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, (bool, TallyError)> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| (true, TallyError::Store(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err((
                status.is_server_error(),
                TallyError::Store(format!("HTTP {status}: {body}")),
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| (false, TallyError::Store(format!("failed to parse response: {e}"))))
    }

    async fn send_write(&self, request: reqwest::RequestBuilder) -> TallyResult<()> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| TallyError::Store(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TallyError::Store(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }

    async fn batch_update(&self, doc: &str, requests: Vec<JsonValue>) -> TallyResult<()> {
        let url = format!("{}/v4/spreadsheets/{doc}:batchUpdate", self.base_url);
        self.send_write(
            self.client
                .post(&url)
                .json(&json!({ "requests": requests })),
        )
        .await
    }
}

/// Minimal path-segment escaping for the characters tab names actually
/// contain (spaces, quotes); everything else the A1 grammar produces is
/// URL-safe as-is.
fn encode_segment(segment: &str) -> String {
    segment
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('\'', "%27")
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn get_values(&self, doc: &str, tab: &str, range: &str) -> TallyResult<Vec<Vec<String>>> {
        let url = self.values_url(doc, tab, range);
        let range: ValueRange = self.get_json(&url).await?;
        Ok(range.into_strings())
    }

    async fn update_values(
        &self,
        doc: &str,
        tab: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> TallyResult<()> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(doc, tab, range));
        self.send_write(self.client.put(&url).json(&json!({ "values": values })))
            .await
    }

    async fn sheet_metadata(&self, doc: &str) -> TallyResult<Vec<TabMeta>> {
        let url = format!(
            "{}/v4/spreadsheets/{doc}?fields=sheets.properties",
            self.base_url
        );
        let meta: SpreadsheetMeta = self.get_json(&url).await?;
        Ok(meta.into_tabs())
    }

    async fn duplicate_tab(&self, doc: &str, source_tab_id: i64, new_name: &str) -> TallyResult<()> {
        self.batch_update(
            doc,
            vec![json!({
                "duplicateSheet": {
                    "sourceSheetId": source_tab_id,
                    "newSheetName": new_name
                }
            })],
        )
        .await
    }

    async fn append_columns(&self, doc: &str, tab_id: i64, count: u32) -> TallyResult<()> {
        self.batch_update(
            doc,
            vec![json!({
                "appendDimension": {
                    "sheetId": tab_id,
                    "dimension": "COLUMNS",
                    "length": count
                }
            })],
        )
        .await
    }

    async fn batch_format(&self, doc: &str, ops: Vec<FormatOp>) -> TallyResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.batch_update(doc, ops.iter().map(format_request).collect())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> SheetsClient {
        SheetsClient::with_base_url(server.uri(), "test-token").unwrap()
    }

    #[tokio::test]
    async fn reads_values_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/doc-1/values/Acacia!A:A"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Acacia!A1:A2",
                "values": [["Item"], ["Tomato"]]
            })))
            .mount(&server)
            .await;

        let values = client(&server)
            .await
            .get_values("doc-1", "Acacia", "A:A")
            .await
            .unwrap();
        assert_eq!(values, vec![vec!["Item".to_string()], vec!["Tomato".to_string()]]);
    }

    #[tokio::test]
    async fn empty_range_reads_as_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "range": "Acacia!B2" })),
            )
            .mount(&server)
            .await;

        let values = client(&server)
            .await
            .get_values("doc-1", "Acacia", "B2")
            .await
            .unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn reads_retry_on_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "values": [["x"]] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let values = client(&server)
            .await
            .get_values("doc-1", "Acacia", "A1")
            .await
            .unwrap();
        assert_eq!(values, vec![vec!["x".to_string()]]);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .get_values("doc-1", "Acacia", "A1")
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Store(message) if message.contains("404")));
    }

    #[tokio::test]
    async fn updates_write_raw_values_once() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/doc-1/values/%27Acacia%20Market%27!B1"))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_partial_json(serde_json::json!({
                "values": [["2024-05-01"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .update_values(
                "doc-1",
                "Acacia Market",
                "B1",
                vec![vec!["2024-05-01".to_string()]],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_writes_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .update_values("doc-1", "Acacia", "B1", vec![vec!["x".to_string()]])
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Store(_)));
    }

    #[tokio::test]
    async fn metadata_lists_tabs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/doc-1"))
            .and(query_param("fields", "sheets.properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sheets": [
                    {"properties": {"title": "Acacia", "sheetId": 0,
                        "gridProperties": {"rowCount": 100, "columnCount": 26}}},
                    {"properties": {"title": "Acacia Market", "sheetId": 12,
                        "gridProperties": {"rowCount": 100, "columnCount": 30}}}
                ]
            })))
            .mount(&server)
            .await;

        let tabs = client(&server).await.sheet_metadata("doc-1").await.unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].title, "Acacia");
        assert_eq!(tabs[1].tab_id, 12);
        assert_eq!(tabs[1].column_count, 30);
    }

    #[tokio::test]
    async fn duplicate_tab_issues_batch_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/doc-1:batchUpdate"))
            .and(body_partial_json(serde_json::json!({
                "requests": [{
                    "duplicateSheet": {
                        "sourceSheetId": 0,
                        "newSheetName": "Acacia Market"
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .duplicate_tab("doc-1", 0, "Acacia Market")
            .await
            .unwrap();
    }
}
