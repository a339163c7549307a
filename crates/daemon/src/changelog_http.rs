//! HTTP-backed [`ChangeLogClient`] over a JSON vault-sync API.

use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use async_trait::async_trait;
use vaultsync_core::changelog::{ChangeLogClient, ChangeLogError, ChangesSince, PingResult, PutResult, RemoteDocVersion};
use vaultsync_core::model::{DocumentId, VaultUpdateId};
use vaultsync_core::path::RelativePath;

#[derive(Debug, Clone)]
pub struct HttpChangeLogClient {
    base_url: Url,
    client: Client,
}

impl HttpChangeLogClient {
    pub fn new(base_url: Url, token: &str) -> Result<Self, ChangeLogError> {
        let mut headers = HeaderMap::new();
        if !token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| ChangeLogError::Permanent(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    fn url(&self, rel: &str) -> Url {
        self.base_url.join(rel).expect("static API route is a valid relative URL")
    }

    /// Sends `request`, deserializing a JSON response, classifying non-2xx status
    /// codes into the engine's error taxonomy (`SPEC_FULL.md` §7).
    async fn call<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        route: &str,
        request: &Req,
    ) -> Result<Resp, ChangeLogError> {
        let response = self
            .client
            .request(method, self.url(route))
            .json(request)
            .send()
            .await
            .map_err(|e| ChangeLogError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response.json::<Resp>().await.map_err(|e| ChangeLogError::Transport(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ChangeLogError::Auth),
            StatusCode::TOO_MANY_REQUESTS => Err(ChangeLogError::RateLimited),
            StatusCode::NOT_FOUND => Err(ChangeLogError::NotFound),
            StatusCode::CONFLICT => Err(ChangeLogError::StaleParent),
            status if status.is_server_error() => Err(ChangeLogError::Transport(status.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ChangeLogError::Permanent(format!("{status}: {body}")))
            }
        }
    }
}

#[derive(Serialize)]
struct EmptyRequest {}

#[derive(Deserialize)]
struct PingResponse {
    server_version: String,
    is_authenticated: bool,
}

#[derive(Serialize)]
struct GetChangesRequest {
    cursor: Option<u64>,
}

#[derive(Deserialize)]
struct WireDocVersion {
    document_id: uuid::Uuid,
    relative_path: String,
    vault_update_id: u64,
    is_deleted: bool,
    content_base64: Option<String>,
}

#[derive(Deserialize)]
struct GetChangesResponse {
    latest_documents: Vec<WireDocVersion>,
    last_update_id: u64,
}

#[derive(Serialize)]
struct GetContentRequest {
    document_id: uuid::Uuid,
}

#[derive(Deserialize)]
struct GetContentResponse {
    content_base64: String,
}

#[derive(Serialize)]
struct PutRequest {
    parent_version_id: Option<u64>,
    relative_path: String,
    content_base64: String,
    created_date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PutResponse {
    document_id: uuid::Uuid,
    version_id: u64,
    relative_path: String,
    content_base64: String,
}

#[derive(Serialize)]
struct DeleteRequest {
    document_id: uuid::Uuid,
    created_date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DeleteResponse {}

fn decode_base64(s: &str) -> Result<Vec<u8>, ChangeLogError> {
    base64::engine::general_purpose::STANDARD.decode(s).map_err(|e| ChangeLogError::Permanent(format!("invalid base64: {e}")))
}

fn parse_relative_path(s: String) -> Result<RelativePath, ChangeLogError> {
    RelativePath::new(s).map_err(|e| ChangeLogError::Permanent(e.to_string()))
}

#[async_trait]
impl ChangeLogClient for HttpChangeLogClient {
    async fn ping(&self) -> Result<PingResult, ChangeLogError> {
        let resp: PingResponse = self.call(reqwest::Method::POST, "/api/v0/ping", &EmptyRequest {}).await?;
        Ok(PingResult { server_version: resp.server_version, is_authenticated: resp.is_authenticated })
    }

    async fn get_changes_since(&self, cursor: Option<VaultUpdateId>) -> Result<ChangesSince, ChangeLogError> {
        let request = GetChangesRequest { cursor: cursor.map(|c| c.0) };
        let resp: GetChangesResponse = self.call(reqwest::Method::POST, "/api/v0/changes", &request).await?;

        let mut latest_documents = Vec::with_capacity(resp.latest_documents.len());
        for doc in resp.latest_documents {
            let content_bytes = match doc.content_base64 {
                Some(b64) => Some(decode_base64(&b64)?),
                None => None,
            };
            latest_documents.push(RemoteDocVersion {
                document_id: DocumentId(doc.document_id),
                relative_path: parse_relative_path(doc.relative_path)?,
                vault_update_id: VaultUpdateId(doc.vault_update_id),
                is_deleted: doc.is_deleted,
                content_bytes,
            });
        }

        Ok(ChangesSince { latest_documents, last_update_id: VaultUpdateId(resp.last_update_id) })
    }

    async fn get_content(&self, document_id: DocumentId) -> Result<Vec<u8>, ChangeLogError> {
        let request = GetContentRequest { document_id: document_id.0 };
        let resp: GetContentResponse = self.call(reqwest::Method::POST, "/api/v0/content", &request).await?;
        decode_base64(&resp.content_base64)
    }

    async fn put(
        &self,
        parent_version_id: Option<VaultUpdateId>,
        relative_path: RelativePath,
        content_bytes: Vec<u8>,
        created_date: DateTime<Utc>,
    ) -> Result<PutResult, ChangeLogError> {
        let request = PutRequest {
            parent_version_id: parent_version_id.map(|v| v.0),
            relative_path: relative_path.as_str().to_string(),
            content_base64: base64::engine::general_purpose::STANDARD.encode(&content_bytes),
            created_date,
        };
        let resp: PutResponse = self.call(reqwest::Method::POST, "/api/v0/put", &request).await?;
        Ok(PutResult {
            document_id: DocumentId(resp.document_id),
            version_id: VaultUpdateId(resp.version_id),
            relative_path: parse_relative_path(resp.relative_path)?,
            content_bytes: decode_base64(&resp.content_base64)?,
        })
    }

    async fn delete(&self, document_id: DocumentId, created_date: DateTime<Utc>) -> Result<(), ChangeLogError> {
        let request = DeleteRequest { document_id: document_id.0, created_date };
        let _: DeleteResponse = self.call(reqwest::Method::POST, "/api/v0/delete", &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_sets_bearer_header() {
        let client = HttpChangeLogClient::new(Url::parse("https://vault.example.com").unwrap(), "secret-token");
        assert!(client.is_ok());
    }

    #[test]
    fn url_joins_relative_routes_against_base() {
        let client = HttpChangeLogClient::new(Url::parse("https://vault.example.com/api/").unwrap(), "").unwrap();
        assert_eq!(client.url("/api/v0/ping").as_str(), "https://vault.example.com/api/v0/ping");
    }
}
