use crate::session::{CaseFailure, Outcome, Session};
use chrono::Utc;
use msi_cluster::{
    upgrade_sampler_config, wait_for_nodes_ready, wait_for_upgrade, ApiClient, ClusterState,
    ResourceCollector, UpgradePolicy, UPGRADE_POLL_INTERVAL,
};
use msi_core::HarnessConfig;
use msi_sampler::SamplerConfig;
use msi_sanity::{PropertyRecorder, SanityConfig, SanityController, SessionHost};
use std::time::Duration;
use tracing::info;

/// Client for the cluster under test, authenticated when a token is given
pub fn api_client(
    config: &HarnessConfig,
    token: Option<&str>,
    insecure: bool,
) -> miette::Result<ApiClient> {
    let url = config.require_kube_api_url()?;
    let client = if insecure {
        ApiClient::insecure(url)?
    } else {
        ApiClient::new(url)
    };

    Ok(match token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

/// Options of the `sanity` subcommand
#[derive(Debug, Clone, Default)]
pub struct SanityOptions {
    /// Wait this long for every node to be Ready before checking
    pub wait_nodes_ready: Option<Duration>,
}

/// Gate the session on cluster health
///
/// In abort mode a failing check ends the process through `host`.
pub async fn run_sanity(
    session: &Session,
    config: &HarnessConfig,
    client: &ApiClient,
    host: &dyn SessionHost,
    options: &SanityOptions,
) -> Outcome {
    let setup = async {
        if let Some(timeout) = options.wait_nodes_ready {
            let sampler = SamplerConfig::new(timeout)
                .map_err(|e| CaseFailure::Setup(e.to_string()))?
                .interval(Duration::from_secs(5))
                .label("all nodes ready");
            wait_for_nodes_ready(client, sampler)
                .await
                .map_err(|e| CaseFailure::Setup(e.to_string()))?;
        }
        ClusterState::fetch(client)
            .await
            .map_err(|e| CaseFailure::Setup(e.to_string()))
    };

    session
        .run_case("test_cluster_sanity", setup, |state| async move {
            let summary = SanityController::new(SanityConfig::from_harness(config), host)
                .with_recorder(session.properties())
                .run(&state.nodes, &state.pods, &state)
                .map_err(|e| CaseFailure::Fail(e.to_string()))?;
            info!(checks = summary.checks_run, "Cluster is sane");
            Ok(())
        })
        .await
}

/// Options of the `wait-upgrade` subcommand
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    pub target_version: String,
    pub cluster_name: Option<String>,
    /// Overrides the default upgrade timeout
    pub timeout: Option<Duration>,
}

/// Wait for a scheduled OCP upgrade to complete
pub async fn run_wait_upgrade(
    session: &Session,
    config: &HarnessConfig,
    client: &ApiClient,
    options: &UpgradeOptions,
) -> Outcome {
    let properties = session.properties();
    if let Some(name) = &options.cluster_name {
        properties.record("cluster_name", name);
    }
    properties.record("ocp_target_version", &options.target_version);

    let collector = config
        .log_collector
        .enabled
        .then(|| ResourceCollector::new(&config.log_collector.base_dir));
    let collector = collector.as_ref();

    let setup = async {
        let sampler = match options.timeout {
            Some(timeout) => SamplerConfig::new(timeout).map(|c| {
                c.interval(UPGRADE_POLL_INTERVAL)
                    .label(format!("cluster upgrade to {}", options.target_version))
            }),
            None => upgrade_sampler_config(&options.target_version),
        };
        sampler.map_err(|e| CaseFailure::Setup(e.to_string()))
    };

    session
        .run_case("test_cluster_upgrade", setup, |sampler| async move {
            wait_for_upgrade(client, &options.target_version, sampler, collector)
                .await
                .map(|_| ())
                .map_err(|e| CaseFailure::Fail(e.to_string()))
        })
        .await
}

/// Upgrade policy body for `target_version`, scheduled from now
pub fn upgrade_policy_json(target_version: &str) -> miette::Result<String> {
    let policy = UpgradePolicy::manual(target_version, Utc::now());
    serde_json::to_string_pretty(&policy)
        .map_err(|e| miette::miette!("Failed to serialize upgrade policy: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use msi_sanity::{RecordingHost, SuiteProperties};

    #[test]
    fn test_api_client_requires_url() {
        let config = HarnessConfig::default();
        let err = api_client(&config, None, false).unwrap_err();
        assert!(err.to_string().contains("kube_api_url"));

        let config = HarnessConfig {
            kube_api_url: Some("https://api.example:6443/".to_string()),
            ..Default::default()
        };
        let client = api_client(&config, Some("token"), false).unwrap();
        assert_eq!(client.base_url(), "https://api.example:6443");
    }

    #[test]
    fn test_upgrade_policy_json() {
        let json = upgrade_policy_json("4.16.2").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "UpgradePolicy");
        assert_eq!(value["version"], "4.16.2");
        assert!(value["next_run"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_sanity_setup_error_when_api_unreachable() {
        let session = Session::new("msi", SuiteProperties::new());
        let host = RecordingHost::new();
        let client = ApiClient::new("http://127.0.0.1:1");

        let outcome = run_sanity(
            &session,
            &HarnessConfig::default(),
            &client,
            &host,
            &SanityOptions::default(),
        )
        .await;

        assert_eq!(outcome.status(), "ERROR");
        assert!(!host.terminated());
    }

    #[tokio::test]
    async fn test_upgrade_records_properties() {
        let session = Session::new("msi", SuiteProperties::new());
        let client = ApiClient::new("http://127.0.0.1:1");
        let options = UpgradeOptions {
            target_version: "4.16.2".to_string(),
            cluster_name: Some("msi-ci-1".to_string()),
            timeout: Some(Duration::from_millis(50)),
        };

        let outcome =
            run_wait_upgrade(&session, &HarnessConfig::default(), &client, &options).await;

        assert_eq!(outcome.status(), "FAILED");
        let props = session.properties();
        assert_eq!(props.get("cluster_name").as_deref(), Some("msi-ci-1"));
        assert_eq!(props.get("ocp_target_version").as_deref(), Some("4.16.2"));
    }
}
