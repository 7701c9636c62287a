//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `IndexConnector`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::SearchConfig;
use crate::errors::IndexError;
use crate::interfaces::{IndexConnector, IndexSession};
use crate::types::{BulkItemResult, BulkSummary};
use search_sync_shared::IndexDocument;

/// Connector that opens a fresh OpenSearch transport per session.
///
/// # Example
///
/// ```ignore
/// let connector = OpenSearchConnector::new("http://localhost:9200")?;
/// let session = connector.connect().await?;
/// let summary = session.bulk_upsert("movies", &documents).await?;
/// session.close().await;
/// ```
#[derive(Debug, Clone)]
pub struct OpenSearchConnector {
    url: Url,
}

impl OpenSearchConnector {
    /// Create a connector for the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchConnector)` - A new connector
    /// * `Err(IndexError)` - If the URL is invalid
    pub fn new(url: &str) -> Result<Self, IndexError> {
        let url = Url::parse(url).map_err(|e| IndexError::connection(e.to_string()))?;
        Ok(Self { url })
    }

    /// Create a connector from connection parameters.
    pub fn from_config(config: &SearchConfig) -> Result<Self, IndexError> {
        Self::new(&config.url())
    }

    /// The server URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl IndexConnector for OpenSearchConnector {
    async fn connect(&self) -> Result<Box<dyn IndexSession>, IndexError> {
        let conn_pool = SingleNodeConnectionPool::new(self.url.clone());
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| IndexError::connection(e.to_string()))?;

        debug!(url = %self.url, "Opened OpenSearch session");

        Ok(Box::new(OpenSearchSession {
            client: OpenSearch::new(transport),
        }))
    }
}

/// One OpenSearch transport, used for the duration of a single call.
pub struct OpenSearchSession {
    client: OpenSearch,
}

impl OpenSearchSession {
    /// Build the NDJSON body of a bulk request.
    ///
    /// Every document becomes an `index` action carrying its own `_id`, which
    /// makes the request an upsert by identity.
    fn bulk_body(documents: &[IndexDocument]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            body.push(json!({"index": {"_id": doc.id}}).into());
            body.push(doc.body.clone().into());
        }
        body
    }

    /// Turn a bulk response body into a per-item summary.
    fn parse_bulk_response(documents: &[IndexDocument], response: &Value) -> BulkSummary {
        let items = response
            .get("items")
            .and_then(|i| i.as_array())
            .map(|items| items.as_slice())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(documents.len());
        let mut succeeded = 0;
        let mut failed = 0;

        for (position, doc) in documents.iter().enumerate() {
            let item = items
                .get(position)
                .and_then(|item| item.get("index"));

            let error = match item {
                Some(item) => item.get("error").map(|e| {
                    e.get("reason")
                        .and_then(|r| r.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                }),
                None => Some("missing item in bulk response".to_string()),
            };

            if error.is_some() {
                failed += 1;
            } else {
                succeeded += 1;
            }

            results.push(BulkItemResult {
                id: doc.id.clone(),
                success: error.is_none(),
                error,
            });
        }

        BulkSummary {
            total: documents.len(),
            succeeded,
            failed,
            results,
        }
    }
}

#[async_trait]
impl IndexSession for OpenSearchSession {
    #[instrument(skip(self, settings))]
    async fn ensure_index(&self, index: &str, settings: &Value) -> Result<bool, IndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => return Ok(false),
            404 => {}
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(IndexError::from_status(status, "Index existence check", &body));
            }
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Lost a race with another writer creating the same index
            if body.contains("resource_already_exists_exception") {
                return Ok(false);
            }
            error!(status = %status, body = %body, "Index creation failed");
            return Err(IndexError::from_status(
                status.as_u16(),
                "Index creation",
                &body,
            ));
        }

        info!(index = %index, "Created search index");
        Ok(true)
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, IndexError> {
        if documents.is_empty() {
            return Ok(BulkSummary::default());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(Self::bulk_body(documents))
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Bulk request failed");
            return Err(IndexError::from_status(status.as_u16(), "Bulk request", &body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| IndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(documents, &response_body);
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }

    async fn health_check(&self) -> Result<bool, IndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| IndexError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexError::parse(e.to_string()))?;

        Ok(body
            .get("status")
            .and_then(|s| s.as_str())
            .map(|s| s != "red")
            .unwrap_or(false))
    }

    async fn close(self: Box<Self>) {
        debug!("Closed OpenSearch session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> IndexDocument {
        IndexDocument {
            id: id.to_string(),
            body: json!({"id": id, "title": "t"}),
        }
    }

    #[test]
    fn test_bulk_body_pairs_action_and_source() {
        let body = OpenSearchSession::bulk_body(&[doc("a"), doc("b")]);
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_parse_bulk_response_all_ok() {
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 200}}
            ]
        });

        let summary = OpenSearchSession::parse_bulk_response(&[doc("a"), doc("b")], &response);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.first_error().is_none());
    }

    #[test]
    fn test_parse_bulk_response_item_errors() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 400, "error": {
                    "type": "strict_dynamic_mapping_exception",
                    "reason": "mapping set to strict"
                }}}
            ]
        });

        let summary = OpenSearchSession::parse_bulk_response(&[doc("a"), doc("b")], &response);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.first_error(), Some("mapping set to strict"));
        assert!(!summary.results[1].success);
    }

    #[test]
    fn test_parse_bulk_response_missing_items() {
        let summary = OpenSearchSession::parse_bulk_response(&[doc("a")], &json!({}));
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_connector_rejects_invalid_url() {
        assert!(OpenSearchConnector::new("not a url").is_err());
        let connector = OpenSearchConnector::from_config(&SearchConfig::default()).unwrap();
        assert_eq!(connector.url().as_str(), "http://localhost:9200/");
    }
}
