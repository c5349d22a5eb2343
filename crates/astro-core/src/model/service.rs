//! サービス定義

use super::port::Port;
use super::volume::{Device, Volume};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// サービスの種類
///
/// カタログに存在するコンテナの全種類。名前はコンテナ名とサービス名を兼ねる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    Jellyfin,
    Plex,
    Emby,
    Radarr,
    Sonarr,
    Lidarr,
    Readarr,
    Prowlarr,
    Bazarr,
    Qbittorrent,
    Sabnzbd,
    Nzbget,
    Traefik,
    NginxProxyManager,
    Homepage,
    Heimdall,
    Watchtower,
    Portainer,
    Overseerr,
    Jellyseerr,
    Tautulli,
    Gluetun,
}

impl ServiceKind {
    /// サービス名（= コンテナ名）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jellyfin => "jellyfin",
            Self::Plex => "plex",
            Self::Emby => "emby",
            Self::Radarr => "radarr",
            Self::Sonarr => "sonarr",
            Self::Lidarr => "lidarr",
            Self::Readarr => "readarr",
            Self::Prowlarr => "prowlarr",
            Self::Bazarr => "bazarr",
            Self::Qbittorrent => "qbittorrent",
            Self::Sabnzbd => "sabnzbd",
            Self::Nzbget => "nzbget",
            Self::Traefik => "traefik",
            Self::NginxProxyManager => "nginx-proxy-manager",
            Self::Homepage => "homepage",
            Self::Heimdall => "heimdall",
            Self::Watchtower => "watchtower",
            Self::Portainer => "portainer",
            Self::Overseerr => "overseerr",
            Self::Jellyseerr => "jellyseerr",
            Self::Tautulli => "tautulli",
            Self::Gluetun => "gluetun",
        }
    }

    /// ダッシュボードに表示する名前
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Jellyfin => "Jellyfin",
            Self::Plex => "Plex",
            Self::Emby => "Emby",
            Self::Radarr => "Radarr",
            Self::Sonarr => "Sonarr",
            Self::Lidarr => "Lidarr",
            Self::Readarr => "Readarr",
            Self::Prowlarr => "Prowlarr",
            Self::Bazarr => "Bazarr",
            Self::Qbittorrent => "qBittorrent",
            Self::Sabnzbd => "SABnzbd",
            Self::Nzbget => "NZBGet",
            Self::Traefik => "Traefik",
            Self::NginxProxyManager => "NPM",
            Self::Homepage => "Homepage",
            Self::Heimdall => "Heimdall",
            Self::Watchtower => "Watchtower",
            Self::Portainer => "Portainer",
            Self::Overseerr => "Overseerr",
            Self::Jellyseerr => "Jellyseerr",
            Self::Tautulli => "Tautulli",
            Self::Gluetun => "Gluetun",
        }
    }

    pub fn class(&self) -> ServiceClass {
        match self {
            Self::Jellyfin | Self::Plex | Self::Emby => ServiceClass::MediaServer,
            Self::Radarr | Self::Sonarr | Self::Lidarr | Self::Readarr | Self::Prowlarr => {
                ServiceClass::Management
            }
            Self::Bazarr => ServiceClass::Management,
            Self::Qbittorrent | Self::Sabnzbd | Self::Nzbget => ServiceClass::Downloader,
            Self::Traefik | Self::NginxProxyManager => ServiceClass::Gateway,
            Self::Homepage | Self::Heimdall => ServiceClass::Dashboard,
            Self::Overseerr | Self::Jellyseerr | Self::Tautulli => ServiceClass::MediaCompanion,
            Self::Watchtower | Self::Portainer => ServiceClass::Utility,
            Self::Gluetun => ServiceClass::Vpn,
        }
    }
}

/// サービスの分類
///
/// VPN ルーティングの対象判定とダッシュボードのグループ分けに使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceClass {
    MediaServer,
    MediaCompanion,
    /// VPN ルーティングの対象
    Downloader,
    Management,
    Gateway,
    Dashboard,
    Utility,
    Vpn,
}

/// ネットワークへの接続方法
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkAttachment {
    /// スタック共通ネットワーク
    #[default]
    Default,
    /// ホストネットワーク (`network_mode: host`)
    Host,
    /// 他サービスのネットワーク名前空間を共有 (`network_mode: service:<name>`)
    Service(String),
}

impl NetworkAttachment {
    /// Compose の network_mode 値（共通ネットワークなら None）
    pub fn network_mode(&self) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Host => Some("host".to_string()),
            Self::Service(name) => Some(format!("service:{}", name)),
        }
    }
}

/// ダッシュボードから開ける Web UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebEndpoint {
    /// ホスト側ポート
    pub port: u16,
    /// dashboard-icons のファイル名 (`sonarr.png`)
    pub icon: String,
    pub description: String,
}

impl WebEndpoint {
    pub fn new(kind: ServiceKind, port: u16, description: impl Into<String>) -> Self {
        Self {
            port,
            icon: format!("{}.png", kind.name()),
            description: description.into(),
        }
    }
}

/// 1コンテナ分のサービス定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub kind: ServiceKind,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub network: NetworkAttachment,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub cap_add: Vec<String>,
    /// コンテナランタイム (`nvidia` など)
    pub runtime: Option<String>,
    pub web: Option<WebEndpoint>,
}

impl ServiceDefinition {
    /// カタログの最小構成
    pub fn new(kind: ServiceKind, image: impl Into<String>) -> Self {
        Self {
            name: kind.name().to_string(),
            kind,
            image: image.into(),
            ports: Vec::new(),
            volumes: Vec::new(),
            devices: Vec::new(),
            environment: BTreeMap::new(),
            depends_on: Vec::new(),
            network: NetworkAttachment::default(),
            command: Vec::new(),
            cap_add: Vec::new(),
            runtime: None,
            web: None,
        }
    }

    pub fn class(&self) -> ServiceClass {
        self.kind.class()
    }

    /// VPN ルーティングの対象か
    pub fn is_downloader(&self) -> bool {
        self.class() == ServiceClass::Downloader
    }

    /// 依存先を追加（重複は無視）
    pub fn depend_on(&mut self, name: &str) {
        if !self.depends_on.iter().any(|d| d == name) {
            self.depends_on.push(name.to_string());
        }
    }

    /// このサービスが参照している他サービス名（depends_on と network_mode）
    pub fn references(&self) -> impl Iterator<Item = &str> {
        let via_network = match &self.network {
            NetworkAttachment::Service(name) => Some(name.as_str()),
            _ => None,
        };
        self.depends_on.iter().map(String::as_str).chain(via_network)
    }
}
