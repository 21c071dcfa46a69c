//! Server health report, served as the `m365://health` resource and the
//! `get_health` tool.

use crate::config::Settings;
use crate::directory::ResourceClient;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Credentials work but the service answered the probe with an error.
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConfiguration {
    pub auth_method: String,
    pub server_name: String,
    pub server_version: String,
    pub audit_logging_enabled: bool,
    pub rate_limit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub authenticated: bool,
    pub graph_api_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub configuration: HealthConfiguration,
}

impl HealthReport {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Probe the remote service and summarise the server's state.
pub async fn check_health(client: &dyn ResourceClient, settings: &Settings) -> HealthReport {
    let (authenticated, connected, organization, error) = match client.organization_name().await {
        Ok(org) => (true, true, org, None),
        Err(e) => {
            tracing::error!(error = %e, "graph connection test failed");
            // An HTTP answer other than 401/403 means a token was accepted.
            let authenticated = matches!(e.status, Some(code) if code != 401 && code != 403);
            (authenticated, false, None, Some(e.to_string()))
        }
    };

    let status = match (authenticated, connected) {
        (true, true) => HealthStatus::Healthy,
        (true, false) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    HealthReport {
        status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        authenticated,
        graph_api_connected: connected,
        organization,
        error,
        configuration: HealthConfiguration {
            auth_method: settings.auth_method.to_string(),
            server_name: settings.mcp_server_name.clone(),
            server_version: settings.mcp_server_version.clone(),
            audit_logging_enabled: settings.enable_audit_logging,
            rate_limit_enabled: settings.rate_limit_enabled,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;

    #[tokio::test]
    async fn healthy_when_probe_succeeds() {
        let report = check_health(&FakeDirectory::new(), &Settings::default()).await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.organization.as_deref(), Some("Contoso"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty()).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["graphApiConnected"], true);
        assert_eq!(json["configuration"]["authMethod"], "device_code");
        assert_eq!(json["configuration"]["serverName"], "m365-admin");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn degraded_when_probe_answers_with_server_error() {
        // Injected failures carry status 500.
        let fake = FakeDirectory::new().fail_on("organization");
        let report = check_health(&fake, &Settings::default()).await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.graph_api_connected);
        assert!(report.error.is_some());
    }
}
