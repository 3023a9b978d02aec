use crate::error::{ClusterError, Result};
use crate::upgrade::ClusterVersion;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::List;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

/// Read-only HTTP client for the Kubernetes API of the cluster under test
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token: None,
        }
    }

    /// Client that skips TLS verification, for clusters with self-signed API certs
    pub fn insecure(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ClusterError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            ..Self::new(base_url)
        })
    }

    /// Send `token` as a bearer token on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = Some(token.trim().to_string());
        self
    }

    /// GET `path` and parse the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ClusterError::transport(&url, e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound { url });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClusterError::parse(&url, e.to_string()))
    }

    /// GET /api/v1/nodes
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let list: List<Node> = self.get_json("/api/v1/nodes").await?;
        Ok(list.items)
    }

    /// GET /api/v1/pods (all namespaces)
    pub async fn list_pods(&self) -> Result<Vec<Pod>> {
        let list: List<Pod> = self.get_json("/api/v1/pods").await?;
        Ok(list.items)
    }

    /// Names of the storage classes defined on the cluster
    pub async fn list_storage_class_names(&self) -> Result<Vec<String>> {
        let list: List<StorageClass> = self
            .get_json("/apis/storage.k8s.io/v1/storageclasses")
            .await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|sc| sc.metadata.name)
            .collect())
    }

    /// GET the OpenShift ClusterVersion singleton
    pub async fn get_cluster_version(&self) -> Result<ClusterVersion> {
        self.get_json("/apis/config.openshift.io/v1/clusterversions/version")
            .await
    }

    /// GET all OpenShift ClusterOperators as raw JSON
    pub async fn list_cluster_operators(&self) -> Result<serde_json::Value> {
        self.get_json("/apis/config.openshift.io/v1/clusteroperators")
            .await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
