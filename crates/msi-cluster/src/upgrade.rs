use crate::api_client::ApiClient;
use crate::collect::ResourceCollector;
use crate::error::{ClusterError, ClusterErrorKind};
use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use msi_sampler::{AsyncTimeoutSampler, ErrorKind, SampleError, SamplerConfig, SamplerConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Lead time between creating an upgrade policy and its scheduled run
pub const UPGRADE_SCHEDULE_DELTA: Duration = Duration::from_secs(10 * 60);

/// Upper bound for an OCP upgrade to finish once it has started
pub const UPGRADE_TIMEOUT: Duration = Duration::from_secs(180 * 60);

pub const UPGRADE_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Body of a manual OSD upgrade policy request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePolicy {
    pub kind: String,
    pub schedule_type: String,
    pub upgrade_type: String,
    pub version: String,
    /// RFC 3339, UTC
    pub next_run: String,
}

impl UpgradePolicy {
    /// Policy that upgrades to `target_version` ten minutes after `now`
    pub fn manual(target_version: impl Into<String>, now: DateTime<Utc>) -> Self {
        let next_run = now + chrono::Duration::seconds(UPGRADE_SCHEDULE_DELTA.as_secs() as i64);
        info!("Set upgrade time to {}", next_run);

        Self {
            kind: "UpgradePolicy".to_string(),
            schedule_type: "manual".to_string(),
            upgrade_type: "OSD".to_string(),
            version: target_version.into(),
            next_run: next_run.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// config.openshift.io/v1 ClusterVersion, reduced to what upgrade waits read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersion {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterVersionSpec,
    #[serde(default)]
    pub status: ClusterVersionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_update: Option<Release>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<Release>,
    /// Newest entry first
    #[serde(default)]
    pub history: Vec<UpdateHistory>,
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistory {
    /// `Completed` or `Partial`
    pub state: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClusterVersion {
    /// Most recent update history entry
    pub fn latest_update(&self) -> Option<&UpdateHistory> {
        self.status.history.first()
    }

    /// One-line rendering of the status conditions for logs
    pub fn conditions_summary(&self) -> String {
        self.status
            .conditions
            .iter()
            .map(|c| match &c.message {
                Some(message) => format!("{}={} ({})", c.type_, c.status, message),
                None => format!("{}={}", c.type_, c.status),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// True once the newest history entry is a completed update to `target_version`
pub fn upgrade_completed(cv: &ClusterVersion, target_version: &str) -> bool {
    cv.latest_update()
        .is_some_and(|h| h.state == "Completed" && h.version == target_version)
}

/// Sampler settings for a full upgrade: the scheduling delay plus the upgrade itself
pub fn upgrade_sampler_config(target_version: &str) -> Result<SamplerConfig, SamplerConfigError> {
    Ok(SamplerConfig::new(UPGRADE_TIMEOUT + UPGRADE_SCHEDULE_DELTA)?
        .interval(UPGRADE_POLL_INTERVAL)
        .label(format!("cluster upgrade to {}", target_version)))
}

fn retry_during_upgrade(e: &ClusterError) -> bool {
    matches!(e.kind(), ClusterErrorKind::Transport | ClusterErrorKind::NotFound)
        || e.is_server_error()
}

/// Poll the ClusterVersion until the upgrade to `target_version` has completed
///
/// Transport errors, 404s and 5xx responses are retried while the API server
/// restarts. Other statuses end the wait. On timeout the last seen conditions are logged and, when a
/// collector is given, the ClusterVersion and ClusterOperators are dumped.
pub async fn wait_for_upgrade(
    client: &ApiClient,
    target_version: &str,
    config: SamplerConfig,
    collector: Option<&ResourceCollector>,
) -> Result<ClusterVersion, SampleError<ClusterError>> {
    let mut last_seen: Option<ClusterVersion> = None;

    let result = AsyncTimeoutSampler::new(config, || client.get_cluster_version())
        .suppress_if(retry_during_upgrade)
        .wait_until(|cv| {
            if let Some(latest) = cv.latest_update() {
                info!(
                    state = %latest.state,
                    version = %latest.version,
                    "Cluster version history"
                );
            }
            last_seen = Some(cv.clone());
            upgrade_completed(cv, target_version)
        })
        .await;

    match result {
        Ok(cv) => {
            info!("Cluster upgraded to {}", target_version);
            Ok(cv)
        }
        Err(e) => {
            if e.is_timeout() {
                let conditions = last_seen
                    .as_ref()
                    .map(ClusterVersion::conditions_summary)
                    .unwrap_or_else(|| "<never fetched>".to_string());
                error!(
                    "Timeout reached while upgrading OCP. clusterversion conditions: {}",
                    conditions
                );
            }
            if let Some(collector) = collector {
                collector
                    .collect_upgrade_state(client, last_seen.as_ref())
                    .await;
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::test_server::serve;
    use chrono::TimeZone;
    use serde_json::json;

    fn cluster_version(state: &str, version: &str) -> String {
        json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "ClusterVersion",
            "metadata": {"name": "version"},
            "spec": {"channel": "candidate-4.16"},
            "status": {
                "history": [
                    {"state": state, "version": version, "startedTime": "2026-01-01T00:00:00Z"},
                    {"state": "Completed", "version": "4.15.9"}
                ],
                "conditions": [
                    {"type": "Progressing", "status": "True", "message": "Working towards 4.16.2"},
                    {"type": "Available", "status": "True"}
                ]
            }
        })
        .to_string()
    }

    fn quick_config() -> SamplerConfig {
        SamplerConfig::new(Duration::from_secs(5))
            .unwrap()
            .interval(Duration::from_millis(10))
    }

    #[test]
    fn test_manual_policy() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let policy = UpgradePolicy::manual("4.16.2", now);

        assert_eq!(policy.next_run, "2026-03-01T12:10:00Z");
        let body = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            body,
            json!({
                "kind": "UpgradePolicy",
                "schedule_type": "manual",
                "upgrade_type": "OSD",
                "version": "4.16.2",
                "next_run": "2026-03-01T12:10:00Z"
            })
        );
    }

    #[test]
    fn test_upgrade_completed() {
        let partial: ClusterVersion =
            serde_json::from_str(&cluster_version("Partial", "4.16.2")).unwrap();
        assert!(!upgrade_completed(&partial, "4.16.2"));

        let done: ClusterVersion =
            serde_json::from_str(&cluster_version("Completed", "4.16.2")).unwrap();
        assert!(upgrade_completed(&done, "4.16.2"));
        // Completed, but not to the requested version
        assert!(!upgrade_completed(&done, "4.17.0"));

        assert!(!upgrade_completed(&ClusterVersion::default(), "4.16.2"));
    }

    #[test]
    fn test_conditions_summary() {
        let cv: ClusterVersion =
            serde_json::from_str(&cluster_version("Partial", "4.16.2")).unwrap();
        assert_eq!(
            cv.conditions_summary(),
            "Progressing=True (Working towards 4.16.2), Available=True"
        );
    }

    #[test]
    fn test_default_sampler_config() {
        let config = upgrade_sampler_config("4.16.2").unwrap();
        assert_eq!(config.wait_timeout(), Duration::from_secs(190 * 60));
        assert_eq!(config.get_interval(), Duration::from_secs(10));
        assert_eq!(config.get_label(), "cluster upgrade to 4.16.2");
    }

    #[tokio::test]
    async fn test_wait_for_upgrade_completes() {
        let url = serve(vec![
            (200, cluster_version("Partial", "4.16.2")),
            (404, "{}".to_string()),
            (200, cluster_version("Completed", "4.16.2")),
        ])
        .await;
        let client = ApiClient::new(&url);

        let cv = wait_for_upgrade(&client, "4.16.2", quick_config(), None)
            .await
            .unwrap();
        assert_eq!(cv.latest_update().unwrap().state, "Completed");
    }

    #[tokio::test]
    async fn test_wait_for_upgrade_times_out_and_collects() {
        let responses = (0..50)
            .map(|_| (200, cluster_version("Partial", "4.16.2")))
            .collect();
        let url = serve(responses).await;
        let client = ApiClient::new(&url);
        let dir = tempfile::tempdir().unwrap();
        let collector = ResourceCollector::new(dir.path());

        let config = SamplerConfig::new(Duration::from_millis(200))
            .unwrap()
            .interval(Duration::from_millis(50));
        let err = wait_for_upgrade(&client, "4.16.2", config, Some(&collector))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let dumped = dir.path().join("clusterversion/version.yaml");
        let yaml = std::fs::read_to_string(dumped).unwrap();
        assert!(yaml.contains("Partial"));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let url = serve(vec![
            (200, cluster_version("Partial", "4.16.2")),
            (503, "apiserver restarting".to_string()),
            (500, "etcdserver: leader changed".to_string()),
            (200, cluster_version("Completed", "4.16.2")),
        ])
        .await;
        let client = ApiClient::new(&url);

        let cv = wait_for_upgrade(&client, "4.16.2", quick_config(), None)
            .await
            .unwrap();
        assert!(upgrade_completed(&cv, "4.16.2"));
    }

    #[test]
    fn test_retry_classification() {
        let status = |status| ClusterError::Status {
            url: "https://api.example:6443/x".to_string(),
            status,
            body: String::new(),
        };
        assert!(retry_during_upgrade(&status(500)));
        assert!(retry_during_upgrade(&status(503)));
        assert!(!retry_during_upgrade(&status(401)));
        assert!(!retry_during_upgrade(&status(403)));
        assert!(retry_during_upgrade(&ClusterError::transport("u", "connection refused")));
        assert!(!retry_during_upgrade(&ClusterError::parse("u", "expected value")));
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let url = serve(vec![(403, "forbidden".to_string())]).await;
        let client = ApiClient::new(&url);

        let err = wait_for_upgrade(&client, "4.16.2", quick_config(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.probe_error(),
            Some(ClusterError::Status { status: 403, .. })
        ));
    }
}
