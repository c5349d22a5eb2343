//! スタック計画

use super::dashboard::DashboardPlan;
use super::port::Protocol;
use super::selection::{Addon, MediaServer, Transcoding};
use super::service::{NetworkAttachment, ServiceDefinition};
use crate::error::{AstroError, Result};
use std::collections::HashSet;
use std::fmt;

/// スタック共通ネットワーク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDeclaration {
    pub name: String,
    /// 既存ネットワークを使う（Compose 側では作成しない）
    pub external: bool,
}

/// 選択内容を縮退させたときの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// GPU が検出されなかったのでソフトウェアトランスコードにした
    TranscodingFallback { requested: Transcoding },
    /// VPN の認証情報がないので VPN を外した
    VpnCredentialsMissing,
    /// VPN を通すダウンローダーがないので VPN を外した
    VpnWithoutDownloader,
    /// メディアサーバーと組み合わせられない追加サービスを外した
    AddonUnsupported {
        addon: Addon,
        media_server: MediaServer,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use super::selection::Choice;

        match self {
            Self::TranscodingFallback { requested } => write!(
                f,
                "{} のデバイスが見つからないため、ソフトウェアトランスコードに切り替えました",
                requested.label()
            ),
            Self::VpnCredentialsMissing => write!(
                f,
                "VPN の認証情報が設定されていないため、VPN を無効にしました"
            ),
            Self::VpnWithoutDownloader => write!(
                f,
                "ダウンローダーが選択されていないため、VPN を無効にしました"
            ),
            Self::AddonUnsupported {
                addon,
                media_server,
            } => write!(
                f,
                "{} は {} と組み合わせられないため、追加しませんでした",
                addon.label(),
                media_server.label()
            ),
        }
    }
}

/// 1回分のスタック構成
///
/// `services` の並び順は依存関係を満たす起動順です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPlan {
    pub services: Vec<ServiceDefinition>,
    pub network: NetworkDeclaration,
    pub dashboard: DashboardPlan,
    pub notices: Vec<Notice>,
}

impl StackPlan {
    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }

    /// VPN コンテナ経由で通信しているサービスがあるか
    pub fn routes_through_vpn(&self) -> bool {
        self.services
            .iter()
            .any(|s| matches!(s.network, NetworkAttachment::Service(_)))
    }

    /// 計画の整合性を検証
    ///
    /// - サービス名が一意
    /// - depends_on と `service:<name>` の参照先が同じ計画内に存在し、自分より前にある
    /// - ホスト側ポートが計画全体で一意
    /// - コンテナ側ポートがネットワーク名前空間ごとに一意
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();

        for service in &self.services {
            for reference in service.references() {
                if reference == service.name {
                    return Err(AstroError::RenderError(format!(
                        "サービス '{}' が自分自身を参照しています",
                        service.name
                    )));
                }
                if !seen.contains(reference) {
                    return Err(AstroError::RenderError(format!(
                        "サービス '{}' の参照先 '{}' が計画に存在しません",
                        service.name, reference
                    )));
                }
            }

            if !seen.insert(service.name.as_str()) {
                return Err(AstroError::RenderError(format!(
                    "サービス名 '{}' が重複しています",
                    service.name
                )));
            }
        }

        self.validate_ports()
    }

    fn validate_ports(&self) -> Result<()> {
        let mut host_ports: HashSet<(u16, Protocol)> = HashSet::new();
        let mut inside_ports: HashSet<(&str, u16, Protocol)> = HashSet::new();

        for service in &self.services {
            // service:<name> で参加しているサービスは所有者の名前空間で数える
            let namespace = match &service.network {
                NetworkAttachment::Service(owner) => owner.as_str(),
                _ => service.name.as_str(),
            };

            for port in &service.ports {
                if !host_ports.insert((port.host, port.protocol)) {
                    return Err(AstroError::RenderError(format!(
                        "ホスト側ポート {} が重複しています（サービス '{}'）",
                        port, service.name
                    )));
                }
                if !inside_ports.insert((namespace, port.container, port.protocol)) {
                    return Err(AstroError::RenderError(format!(
                        "'{}' の名前空間でコンテナ側ポート {} が重複しています",
                        namespace, port
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::selection::Dashboard;
    use crate::model::service::ServiceKind;

    fn plan(services: Vec<ServiceDefinition>) -> StackPlan {
        StackPlan {
            services,
            network: NetworkDeclaration {
                name: "astro-network".to_string(),
                external: false,
            },
            dashboard: DashboardPlan {
                kind: Dashboard::Homepage,
                server_address: "localhost".to_string(),
                entries: vec![],
            },
            notices: vec![],
        }
    }

    #[test]
    fn test_validate_accepts_ordered_references() {
        let gluetun = ServiceDefinition::new(ServiceKind::Gluetun, "gluetun");
        let mut qbit = ServiceDefinition::new(ServiceKind::Qbittorrent, "qbit");
        qbit.network = NetworkAttachment::Service("gluetun".to_string());
        qbit.depend_on("gluetun");

        assert!(plan(vec![gluetun, qbit]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_dependency() {
        let mut bazarr = ServiceDefinition::new(ServiceKind::Bazarr, "bazarr");
        bazarr.depend_on("sonarr");

        let err = plan(vec![bazarr]).validate().unwrap_err();
        assert!(matches!(err, AstroError::RenderError(msg) if msg.contains("sonarr")));
    }

    #[test]
    fn test_validate_rejects_dangling_network_owner() {
        let mut qbit = ServiceDefinition::new(ServiceKind::Qbittorrent, "qbit");
        qbit.network = NetworkAttachment::Service("gluetun".to_string());

        assert!(plan(vec![qbit]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let a = ServiceDefinition::new(ServiceKind::Radarr, "radarr");
        let b = ServiceDefinition::new(ServiceKind::Radarr, "radarr");

        let err = plan(vec![a, b]).validate().unwrap_err();
        assert!(matches!(err, AstroError::RenderError(msg) if msg.contains("重複")));
    }

    #[test]
    fn test_validate_rejects_shared_namespace_port_clash() {
        use crate::model::Port;

        let mut gluetun = ServiceDefinition::new(ServiceKind::Gluetun, "gluetun");
        gluetun.ports = vec![Port::tcp(8080, 8080), Port::tcp(8085, 8080)];

        let err = plan(vec![gluetun]).validate().unwrap_err();
        assert!(matches!(err, AstroError::RenderError(msg) if msg.contains("gluetun")));
    }

    #[test]
    fn test_validate_rejects_duplicate_host_port() {
        use crate::model::Port;

        let mut overseerr = ServiceDefinition::new(ServiceKind::Overseerr, "overseerr");
        overseerr.ports = vec![Port::tcp(5055, 5055)];
        let mut jellyseerr = ServiceDefinition::new(ServiceKind::Jellyseerr, "jellyseerr");
        jellyseerr.ports = vec![Port::tcp(5055, 5055)];

        let err = plan(vec![overseerr, jellyseerr]).validate().unwrap_err();
        assert!(matches!(err, AstroError::RenderError(msg) if msg.contains("5055")));
    }

    #[test]
    fn test_notice_messages() {
        let notice = Notice::AddonUnsupported {
            addon: Addon::Tautulli,
            media_server: MediaServer::Jellyfin,
        };
        assert!(notice.to_string().contains("Tautulli"));
        assert!(notice.to_string().contains("Jellyfin"));
    }
}
