//! Compose ドキュメント
//!
//! マップはすべて `BTreeMap` なので、同じ計画からは同じバイト列が得られます。

use crate::error::{AstroError, Result};
use crate::model::{NetworkAttachment, StackPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// docker-compose.yml のルート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDocument {
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ComposeNetwork>,
}

/// サービス1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    pub restart: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeNetwork {
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
}

/// 全サービス共通の再起動ポリシー
pub const RESTART_POLICY: &str = "unless-stopped";

/// 計画内で使うネットワークのキー
pub const DEFAULT_NETWORK: &str = "default";

impl ComposeDocument {
    pub fn from_plan(plan: &StackPlan) -> Self {
        let services = plan
            .services
            .iter()
            .map(|service| {
                let networks = match service.network {
                    NetworkAttachment::Default => vec![DEFAULT_NETWORK.to_string()],
                    NetworkAttachment::Host | NetworkAttachment::Service(_) => Vec::new(),
                };

                let compose = ComposeService {
                    image: service.image.clone(),
                    container_name: service.name.clone(),
                    restart: RESTART_POLICY.to_string(),
                    runtime: service.runtime.clone(),
                    network_mode: service.network.network_mode(),
                    command: service.command.clone(),
                    cap_add: service.cap_add.clone(),
                    devices: service.devices.iter().map(ToString::to_string).collect(),
                    environment: service.environment.clone(),
                    ports: service.ports.iter().map(ToString::to_string).collect(),
                    volumes: service.volumes.iter().map(ToString::to_string).collect(),
                    networks,
                    depends_on: service.depends_on.clone(),
                };
                (service.name.clone(), compose)
            })
            .collect();

        let networks = BTreeMap::from([(
            DEFAULT_NETWORK.to_string(),
            ComposeNetwork {
                name: plan.network.name.clone(),
                external: plan.network.external,
            },
        )]);

        Self { services, networks }
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| AstroError::RenderError(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| AstroError::RenderError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::layout::StackConfig;
    use crate::model::{ProbedCapabilities, Selection};

    fn default_document() -> ComposeDocument {
        let plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );
        ComposeDocument::from_plan(&plan)
    }

    #[test]
    fn test_services_join_default_network() {
        let doc = default_document();
        assert_eq!(doc.services["sonarr"].networks, vec!["default".to_string()]);
        assert_eq!(doc.networks["default"].name, "astro-network");
        assert!(!doc.networks["default"].external);
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = default_document().to_yaml().unwrap();
        assert!(yaml.starts_with("services:\n"));
        assert!(yaml.contains("container_name: qbittorrent"));
        assert!(yaml.contains("- 6881:6881/udp"));
        assert!(yaml.contains("restart: unless-stopped"));
        assert!(!yaml.contains("version:"));
        assert!(!yaml.contains("external"));
    }

    #[test]
    fn test_scalar_like_values_stay_strings() {
        let yaml = default_document().to_yaml().unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let env = &parsed["services"]["watchtower"]["environment"];
        assert_eq!(env["WATCHTOWER_CLEANUP"].as_str(), Some("true"));
        let env = &parsed["services"]["sonarr"]["environment"];
        assert_eq!(env["PUID"].as_str(), Some("1000"));
    }
}
