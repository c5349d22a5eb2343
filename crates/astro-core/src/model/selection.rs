//! 選択内容の定義
//!
//! ウィザードの各設問は閉じた列挙型で表現されます。
//! 回答ファイル（YAML / JSON）では各選択肢の `id()` を文字列として保存します。

use crate::error::{AstroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// 設問の選択肢
///
/// `ALL` の並び順がそのままメニューの表示順になります。
pub trait Choice: Copy + Eq + Sized + 'static {
    /// 回答ファイルとエラーメッセージで使う設問名
    const AXIS: &'static str;
    /// 全選択肢（表示順）
    const ALL: &'static [Self];

    /// 回答ファイルに書き出す識別子
    fn id(&self) -> &'static str;
    /// メニューに表示する名前
    fn label(&self) -> &'static str;
    /// メニューに表示する説明
    fn description(&self) -> &'static str;

    /// 識別子からパース
    fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|choice| choice.id() == wanted)
            .ok_or_else(|| AstroError::UnknownServiceVariant {
                axis: Self::AXIS,
                value: s.to_string(),
                expected: Self::ALL
                    .iter()
                    .map(|choice| choice.id())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// メディアサーバー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaServer {
    #[default]
    Jellyfin,
    Plex,
    Emby,
}

impl Choice for MediaServer {
    const AXIS: &'static str = "media_server";
    const ALL: &'static [Self] = &[Self::Jellyfin, Self::Plex, Self::Emby];

    fn id(&self) -> &'static str {
        match self {
            Self::Jellyfin => "jellyfin",
            Self::Plex => "plex",
            Self::Emby => "emby",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Jellyfin => "Jellyfin",
            Self::Plex => "Plex",
            Self::Emby => "Emby",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Jellyfin => "無料・オープンソースのメディアサーバー",
            Self::Plex => "定番のメディアサーバー（アカウントが必要）",
            Self::Emby => "プラグイン対応のメディアサーバー",
        }
    }
}

/// トレントクライアント
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TorrentClient {
    #[default]
    Qbittorrent,
}

impl Choice for TorrentClient {
    const AXIS: &'static str = "torrent";
    const ALL: &'static [Self] = &[Self::Qbittorrent];

    fn id(&self) -> &'static str {
        "qbittorrent"
    }

    fn label(&self) -> &'static str {
        "qBittorrent"
    }

    fn description(&self) -> &'static str {
        "Web UI 付きのトレントクライアント"
    }
}

/// Usenet クライアント
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsenetClient {
    #[default]
    Sabnzbd,
    Nzbget,
}

impl Choice for UsenetClient {
    const AXIS: &'static str = "usenet";
    const ALL: &'static [Self] = &[Self::Sabnzbd, Self::Nzbget];

    fn id(&self) -> &'static str {
        match self {
            Self::Sabnzbd => "sabnzbd",
            Self::Nzbget => "nzbget",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Sabnzbd => "SABnzbd",
            Self::Nzbget => "NZBGet",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Sabnzbd => "Python 製の Usenet ダウンローダー",
            Self::Nzbget => "軽量な C++ 製 Usenet ダウンローダー",
        }
    }
}

/// リバースプロキシ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gateway {
    #[default]
    Traefik,
    NginxProxyManager,
    /// ゲートウェイなし
    Disabled,
}

impl Choice for Gateway {
    const AXIS: &'static str = "gateway";
    const ALL: &'static [Self] = &[Self::Traefik, Self::NginxProxyManager, Self::Disabled];

    fn id(&self) -> &'static str {
        match self {
            Self::Traefik => "traefik",
            Self::NginxProxyManager => "nginx-proxy-manager",
            Self::Disabled => "none",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Traefik => "Traefik",
            Self::NginxProxyManager => "Nginx Proxy Manager",
            Self::Disabled => "なし",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Traefik => "自動検出に対応したモダンなリバースプロキシ",
            Self::NginxProxyManager => "GUI で操作できるリバースプロキシ",
            Self::Disabled => "リバースプロキシを使わない",
        }
    }
}

/// ダッシュボード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dashboard {
    #[default]
    Homepage,
    Heimdall,
}

impl Choice for Dashboard {
    const AXIS: &'static str = "dashboard";
    const ALL: &'static [Self] = &[Self::Homepage, Self::Heimdall];

    fn id(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Heimdall => "heimdall",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Homepage => "Homepage",
            Self::Heimdall => "Heimdall",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Homepage => "サービスウィジェット付きのダッシュボード",
            Self::Heimdall => "シンプルなアプリケーションランチャー",
        }
    }
}

/// 追加サービス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Addon {
    /// 字幕の自動取得
    Bazarr,
    /// リクエスト管理（メディアサーバーに応じて Overseerr / Jellyseerr）
    Requests,
    /// Plex の統計
    Tautulli,
    /// コンテナ管理
    Portainer,
}

impl Choice for Addon {
    const AXIS: &'static str = "addons";
    const ALL: &'static [Self] = &[Self::Bazarr, Self::Requests, Self::Tautulli, Self::Portainer];

    fn id(&self) -> &'static str {
        match self {
            Self::Bazarr => "bazarr",
            Self::Requests => "requests",
            Self::Tautulli => "tautulli",
            Self::Portainer => "portainer",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Bazarr => "Bazarr",
            Self::Requests => "Overseerr / Jellyseerr",
            Self::Tautulli => "Tautulli",
            Self::Portainer => "Portainer",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Bazarr => "字幕を自動でダウンロード",
            Self::Requests => "メディアのリクエスト管理",
            Self::Tautulli => "Plex の再生統計",
            Self::Portainer => "Docker コンテナの管理画面",
        }
    }
}

impl Addon {
    /// このメディアサーバーと組み合わせられるか
    pub fn supports(&self, media_server: MediaServer) -> bool {
        match self {
            Self::Tautulli => media_server == MediaServer::Plex,
            Self::Bazarr | Self::Requests | Self::Portainer => true,
        }
    }

    /// 初期状態で有効な追加サービス
    pub fn defaults() -> BTreeSet<Addon> {
        BTreeSet::from([Self::Bazarr, Self::Portainer])
    }
}

/// ハードウェアトランスコード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transcoding {
    #[default]
    Software,
    Nvidia,
    Intel,
}

impl Choice for Transcoding {
    const AXIS: &'static str = "transcoding";
    const ALL: &'static [Self] = &[Self::Software, Self::Nvidia, Self::Intel];

    fn id(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Nvidia => "nvidia",
            Self::Intel => "intel",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Software => "ソフトウェア",
            Self::Nvidia => "NVIDIA GPU (NVENC)",
            Self::Intel => "Intel QuickSync (VAAPI)",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Software => "CPU でトランスコードする",
            Self::Nvidia => "NVIDIA Container Toolkit が必要",
            Self::Intel => "/dev/dri をメディアサーバーに渡す",
        }
    }
}

/// VPN プロバイダー（gluetun 経由）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VpnProvider {
    #[default]
    NordVpn,
    ExpressVpn,
    PrivateInternetAccess,
    Surfshark,
    Mullvad,
    ProtonVpn,
    Windscribe,
    Custom,
}

impl Choice for VpnProvider {
    const AXIS: &'static str = "vpn";
    const ALL: &'static [Self] = &[
        Self::NordVpn,
        Self::ExpressVpn,
        Self::PrivateInternetAccess,
        Self::Surfshark,
        Self::Mullvad,
        Self::ProtonVpn,
        Self::Windscribe,
        Self::Custom,
    ];

    fn id(&self) -> &'static str {
        match self {
            Self::NordVpn => "nordvpn",
            Self::ExpressVpn => "expressvpn",
            Self::PrivateInternetAccess => "private-internet-access",
            Self::Surfshark => "surfshark",
            Self::Mullvad => "mullvad",
            Self::ProtonVpn => "protonvpn",
            Self::Windscribe => "windscribe",
            Self::Custom => "custom",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::NordVpn => "NordVPN",
            Self::ExpressVpn => "ExpressVPN",
            Self::PrivateInternetAccess => "Private Internet Access (PIA)",
            Self::Surfshark => "Surfshark",
            Self::Mullvad => "Mullvad",
            Self::ProtonVpn => "ProtonVPN",
            Self::Windscribe => "Windscribe",
            Self::Custom => "その他の OpenVPN プロバイダー",
        }
    }

    fn description(&self) -> &'static str {
        "OpenVPN"
    }
}

impl VpnProvider {
    /// gluetun の VPN_SERVICE_PROVIDER に渡す値
    pub fn gluetun_name(&self) -> &'static str {
        match self {
            Self::PrivateInternetAccess => "private internet access",
            other => other.id(),
        }
    }
}

/// ウィザード1回分の選択内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub media_server: MediaServer,
    pub torrent: Option<TorrentClient>,
    pub usenet: Option<UsenetClient>,
    pub gateway: Gateway,
    pub dashboard: Dashboard,
    pub addons: BTreeSet<Addon>,
    pub transcoding: Transcoding,
    /// None なら VPN 無効
    pub vpn: Option<VpnProvider>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            media_server: MediaServer::default(),
            torrent: Some(TorrentClient::default()),
            usenet: None,
            gateway: Gateway::default(),
            dashboard: Dashboard::default(),
            addons: Addon::defaults(),
            transcoding: Transcoding::default(),
            vpn: None,
        }
    }
}

impl Selection {
    /// ダウンローダーが1つ以上有効か
    pub fn has_downloader(&self) -> bool {
        self.torrent.is_some() || self.usenet.is_some()
    }

    /// 回答ファイルから組み立てる
    ///
    /// 省略された設問は既定値になります。`"none"` は無効を表します。
    pub fn from_answers(answers: &Answers) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            media_server: parse_or(answers.media_server.as_deref(), defaults.media_server)?,
            torrent: parse_optional(answers.torrent.as_deref(), defaults.torrent)?,
            usenet: parse_optional(answers.usenet.as_deref(), defaults.usenet)?,
            gateway: parse_or(answers.gateway.as_deref(), defaults.gateway)?,
            dashboard: parse_or(answers.dashboard.as_deref(), defaults.dashboard)?,
            addons: match &answers.addons {
                Some(ids) => ids
                    .iter()
                    .map(|id| Addon::parse(id))
                    .collect::<Result<BTreeSet<_>>>()?,
                None => defaults.addons,
            },
            transcoding: parse_or(answers.transcoding.as_deref(), defaults.transcoding)?,
            vpn: parse_optional(answers.vpn.as_deref(), defaults.vpn)?,
        })
    }

    /// 回答ファイル形式に変換
    pub fn to_answers(&self) -> Answers {
        Answers {
            media_server: Some(self.media_server.id().to_string()),
            torrent: Some(optional_id(self.torrent)),
            usenet: Some(optional_id(self.usenet)),
            gateway: Some(self.gateway.id().to_string()),
            dashboard: Some(self.dashboard.id().to_string()),
            addons: Some(self.addons.iter().map(|a| a.id().to_string()).collect()),
            transcoding: Some(self.transcoding.id().to_string()),
            vpn: Some(optional_id(self.vpn)),
        }
    }
}

const DISABLED_ID: &str = "none";

fn parse_or<T: Choice>(value: Option<&str>, default: T) -> Result<T> {
    value.map(T::parse).unwrap_or(Ok(default))
}

fn parse_optional<T: Choice>(value: Option<&str>, default: Option<T>) -> Result<Option<T>> {
    match value {
        None => Ok(default),
        Some(v) if v.trim().eq_ignore_ascii_case(DISABLED_ID) => Ok(None),
        Some(v) => T::parse(v).map(Some),
    }
}

fn optional_id<T: Choice>(value: Option<T>) -> String {
    value
        .map(|v| v.id().to_string())
        .unwrap_or_else(|| DISABLED_ID.to_string())
}

/// 回答ファイル
///
/// ```yaml
/// media_server: plex
/// torrent: qbittorrent
/// usenet: none
/// gateway: traefik
/// dashboard: homepage
/// addons: [bazarr, portainer]
/// transcoding: software
/// vpn: mullvad
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Answers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usenet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn: Option<String>,
}

impl Answers {
    /// 回答ファイルを読み込む（拡張子 .json は JSON、それ以外は YAML）
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |message: String| AstroError::InvalidAnswers {
            path: path.to_path_buf(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;

        if is_json(path) {
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))
        } else {
            serde_yaml::from_str(&contents).map_err(|e| invalid(e.to_string()))
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| AstroError::RenderError(e.to_string()))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
