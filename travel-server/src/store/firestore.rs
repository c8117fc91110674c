//! Firestore REST client.
//!
//! Implements [`DocumentStore`] against the Firestore v1 REST API. Works
//! with both the hosted service (bearer access token) and the local
//! emulator (set `base_url`, token optional).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::error::StoreError;
use super::wire::{RunQueryItem, WireDocument, to_wire};
use super::{Document, DocumentStore, Fields};

/// Default base URL for the Firestore REST API.
const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Configuration for the Firestore client.
#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// Base URL for the API (defaults to production Firestore)
    pub base_url: String,
    /// OAuth access token sent as a bearer token
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FirestoreConfig {
    /// Create a new config for the given project.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (emulator or testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the OAuth access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Firestore REST client.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `{base}/projects/{project}/databases/(default)/documents`
    documents_url: String,
}

impl FirestoreStore {
    /// Create a new Firestore client with the given configuration.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                StoreError::Api {
                    status: 0,
                    message: "Invalid access token format".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            documents_url: documents_url(&config),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }
}

fn documents_url(config: &FirestoreConfig) -> String {
    format!(
        "{}/projects/{}/databases/(default)/documents",
        config.base_url.trim_end_matches('/'),
        config.project_id
    )
}

/// Map error statuses, leaving 404 to the caller.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized);
    }

    if !status.is_success() && status != StatusCode::NOT_FOUND {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| StoreError::Json {
        message: format!("{e} (body: {})", body.chars().take(500).collect::<String>()),
    })
}

fn into_document(wire: WireDocument) -> Result<Document, StoreError> {
    let id = wire
        .id()
        .map(str::to_string)
        .ok_or_else(|| StoreError::Json {
            message: "document without a resource name".to_string(),
        })?;
    Ok(Document::new(id, wire.into_fields()))
}

/// `updateMask.fieldPaths` parameters covering every field.
fn field_mask(fields: &Fields) -> Vec<(&'static str, String)> {
    fields
        .keys()
        .map(|key| ("updateMask.fieldPaths", key.clone()))
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .http
            .get(self.document_url(collection, id))
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let wire: WireDocument = read_json(response).await?;
        into_document(wire).map(Some)
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let response = self
            .http
            .post(self.collection_url(collection))
            .json(&WireDocument::from_fields(&fields))
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::Api {
                status: 404,
                message: format!("collection {collection} not reachable"),
            });
        }

        let wire: WireDocument = read_json(response).await?;
        Ok(into_document(wire)?.id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut request = self.http.patch(self.document_url(collection, id));
        if merge {
            request = request.query(&field_mask(&fields));
        }

        let response = request
            .json(&WireDocument::from_fields(&fields))
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let response = self
            .http
            .patch(self.document_url(collection, id))
            .query(&field_mask(&fields))
            .query(&[("currentDocument.exists", "true")])
            .json(&WireDocument::from_fields(&fields))
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.document_url(collection, id))
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": to_wire(value),
                    }
                }
            }
        });

        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_url))
            .json(&body)
            .send()
            .await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let items: Vec<RunQueryItem> = read_json(response).await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(into_document)
            .collect()
    }
}
