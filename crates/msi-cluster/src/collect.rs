use crate::api_client::ApiClient;
use crate::upgrade::ClusterVersion;
use msi_core::{HarnessError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Dumps cluster resources as YAML under the log collector directory
///
/// Layout: `<base_dir>/<kind>/<name>.yaml`
#[derive(Debug, Clone)]
pub struct ResourceCollector {
    base_dir: PathBuf,
}

impl ResourceCollector {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write one resource, replacing any earlier dump of it
    pub fn write_yaml<T: Serialize>(&self, kind: &str, name: &str, resource: &T) -> Result<PathBuf> {
        let dir = self.base_dir.join(kind.to_lowercase());
        std::fs::create_dir_all(&dir).map_err(|e| HarnessError::io(&dir, &e))?;

        let path = dir.join(format!("{}.yaml", name));
        let yaml = serde_yaml::to_string(resource)
            .map_err(|e| HarnessError::serialization(format!("{} {}: {}", kind, name, e)))?;
        std::fs::write(&path, yaml).map_err(|e| HarnessError::io(&path, &e))?;

        Ok(path)
    }

    /// Dump the ClusterVersion and every ClusterOperator after a failed upgrade wait
    ///
    /// Collection problems are logged and never fail the caller.
    pub async fn collect_upgrade_state(
        &self,
        client: &ApiClient,
        cluster_version: Option<&ClusterVersion>,
    ) {
        if let Some(cv) = cluster_version {
            let name = cv.metadata.name.as_deref().unwrap_or("version");
            if let Err(e) = self.write_yaml("ClusterVersion", name, cv) {
                warn!("Failed to collect resources: {}", e);
            }
        }

        let operators = match client.list_cluster_operators().await {
            Ok(list) => list,
            Err(e) => {
                warn!("Failed to collect resources: {}", e);
                return;
            }
        };

        let items = operators
            .get("items")
            .and_then(|items| items.as_array())
            .cloned()
            .unwrap_or_default();
        let mut written = 0;
        for item in &items {
            let Some(name) = item.pointer("/metadata/name").and_then(|n| n.as_str()) else {
                continue;
            };
            match self.write_yaml("ClusterOperator", name, item) {
                Ok(_) => written += 1,
                Err(e) => warn!("Failed to collect resources: {}", e),
            }
        }

        info!(
            dir = %self.base_dir.display(),
            operators = written,
            "Collected cluster upgrade resources"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::test_server::serve;
    use serde_json::json;

    #[test]
    fn test_write_yaml_layout() {
        let dir = tempfile::tempdir().unwrap();
        let collector = ResourceCollector::new(dir.path());

        let path = collector
            .write_yaml("ClusterVersion", "version", &ClusterVersion::default())
            .unwrap();
        assert_eq!(path, dir.path().join("clusterversion/version.yaml"));
        assert!(std::fs::read_to_string(path).unwrap().contains("status"));
    }

    #[tokio::test]
    async fn test_collects_operators() {
        let body = json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "ClusterOperatorList",
            "items": [
                {"metadata": {"name": "authentication"}, "status": {}},
                {"metadata": {"name": "dns"}},
                {"metadata": {}}
            ]
        });
        let url = serve(vec![(200, body.to_string())]).await;
        let dir = tempfile::tempdir().unwrap();

        ResourceCollector::new(dir.path())
            .collect_upgrade_state(&ApiClient::new(&url), None)
            .await;

        let operators = dir.path().join("clusteroperator");
        assert!(operators.join("authentication.yaml").exists());
        assert!(operators.join("dns.yaml").exists());
        assert_eq!(std::fs::read_dir(operators).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cv = ClusterVersion::default();

        ResourceCollector::new(dir.path())
            .collect_upgrade_state(&ApiClient::new("http://127.0.0.1:1"), Some(&cv))
            .await;

        assert!(dir.path().join("clusterversion/version.yaml").exists());
    }
}
