use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::models::Document;

#[derive(Debug, Deserialize)]
struct ListResponse {
    count: i64,
    results: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: i64,
    title: String,
    #[serde(default)]
    original_file_name: Option<String>,
    #[serde(default)]
    document_type: Option<DocumentTypeRef>,
    #[serde(default)]
    tags: Vec<TagRef>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
    #[serde(default)]
    page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentTypeRef {
    Name(String),
    Id(i64),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagRef {
    Name(String),
    Id(i64),
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Document {
            id: raw.id,
            title: raw.title,
            original_filename: raw.original_file_name,
            file_type: raw.document_type.map(|t| match t {
                DocumentTypeRef::Name(n) => n,
                DocumentTypeRef::Id(i) => i.to_string(),
            }),
            tags: raw
                .tags
                .into_iter()
                .map(|t| match t {
                    TagRef::Name(n) => n,
                    TagRef::Id(i) => i.to_string(),
                })
                .collect(),
            created: raw.created,
            modified: raw.modified,
            page_count: raw.page_count,
        }
    }
}

pub struct PagedDocuments {
    pub documents: Vec<Document>,
    pub count: i64,
}

/// Thin façade over the external document-management service. Reads only:
/// listing, metadata lookup, and raw content download.
pub struct DmsClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DmsClient {
    pub fn new(base_url: String, token: String) -> Self {
        DmsClient {
            client: Client::new(),
            base_url,
            token,
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    pub async fn list_documents(
        &self,
        updated_after: Option<DateTime<Utc>>,
        page_size: usize,
        page: usize,
        ordering: &str,
    ) -> Result<PagedDocuments> {
        let mut req = self
            .client
            .get(format!("{}/api/documents/", self.base_url))
            .header("Authorization", self.auth_header())
            .timeout(Duration::from_secs(60))
            .query(&[("ordering", ordering), ("page_size", &page_size.to_string())])
            .query(&[("page", page)]);

        if let Some(after) = updated_after {
            req = req.query(&[("modified__gt", after.to_rfc3339())]);
        }

        let response = req.send().await.map_err(|e| RagError::UpstreamDms {
            operation: "list_documents".into(),
            status: None,
            cause: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::UpstreamDms {
                operation: "list_documents".into(),
                status: Some(status.as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ListResponse = response.json().await.map_err(|e| RagError::UpstreamDms {
            operation: "list_documents".into(),
            status: Some(status.as_u16()),
            cause: e.to_string(),
        })?;

        Ok(PagedDocuments {
            documents: parsed.results.into_iter().map(Document::from).collect(),
            count: parsed.count,
        })
    }

    pub async fn get_document(&self, doc_id: i64) -> Result<Document> {
        let response = self
            .client
            .get(format!("{}/api/documents/{}/", self.base_url, doc_id))
            .header("Authorization", self.auth_header())
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| RagError::UpstreamDms {
                operation: "get_document".into(),
                status: None,
                cause: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RagError::NotFound(format!("document {doc_id}")));
        }
        if !status.is_success() {
            return Err(RagError::UpstreamDms {
                operation: "get_document".into(),
                status: Some(status.as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }

        let raw: RawDocument = response.json().await.map_err(|e| RagError::UpstreamDms {
            operation: "get_document".into(),
            status: Some(status.as_u16()),
            cause: e.to_string(),
        })?;

        Ok(Document::from(raw))
    }

    pub async fn download_document(&self, doc_id: i64) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(format!("{}/api/documents/{}/download/", self.base_url, doc_id))
            .header("Authorization", self.auth_header())
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(|e| RagError::UpstreamDms {
                operation: "download_document".into(),
                status: None,
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::UpstreamDms {
                operation: "download_document".into(),
                status: Some(status.as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| RagError::UpstreamDms {
                operation: "download_document".into(),
                status: Some(status.as_u16()),
                cause: e.to_string(),
            })
    }

    pub fn build_document_url(&self, doc_id: i64) -> String {
        format!("{}/documents/{}", self.base_url, doc_id)
    }

    pub async fn test_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/documents/?page_size=1", self.base_url))
            .header("Authorization", self.auth_header())
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| RagError::UpstreamDms {
                operation: "test_connection".into(),
                status: None,
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RagError::UpstreamDms {
                operation: "test_connection".into(),
                status: Some(response.status().as_u16()),
                cause: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_document_url_has_no_trailing_slash_duplication() {
        let client = DmsClient::new("http://dms.local".to_string(), "tok".to_string());
        assert_eq!(client.build_document_url(42), "http://dms.local/documents/42");
    }
}
