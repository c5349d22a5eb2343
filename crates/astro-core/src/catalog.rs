//! サービスカタログ
//!
//! 各 `ServiceKind` の静的なテンプレート。選択内容に依存する調整
//! （VPN、トランスコード、依存関係）はアセンブラーが行います。

use crate::layout::StackConfig;
use crate::model::{
    Dashboard, Device, Gateway, MediaServer, NetworkAttachment, Port, ServiceDefinition,
    ServiceKind, TorrentClient, UsenetClient, Volume, WebEndpoint,
};

const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// qBittorrent の WebUI の待ち受けポート
const QBITTORRENT_PORT_ENV: &str = "WEBUI_PORT";

/// 選択に関係なく常に含まれるサービス（起動順）
pub const ALWAYS_ON: [ServiceKind; 6] = [
    ServiceKind::Radarr,
    ServiceKind::Sonarr,
    ServiceKind::Lidarr,
    ServiceKind::Readarr,
    ServiceKind::Prowlarr,
    ServiceKind::Watchtower,
];

impl From<MediaServer> for ServiceKind {
    fn from(value: MediaServer) -> Self {
        match value {
            MediaServer::Jellyfin => Self::Jellyfin,
            MediaServer::Plex => Self::Plex,
            MediaServer::Emby => Self::Emby,
        }
    }
}

impl From<TorrentClient> for ServiceKind {
    fn from(value: TorrentClient) -> Self {
        match value {
            TorrentClient::Qbittorrent => Self::Qbittorrent,
        }
    }
}

impl From<UsenetClient> for ServiceKind {
    fn from(value: UsenetClient) -> Self {
        match value {
            UsenetClient::Sabnzbd => Self::Sabnzbd,
            UsenetClient::Nzbget => Self::Nzbget,
        }
    }
}

impl From<Dashboard> for ServiceKind {
    fn from(value: Dashboard) -> Self {
        match value {
            Dashboard::Homepage => Self::Homepage,
            Dashboard::Heimdall => Self::Heimdall,
        }
    }
}

impl Gateway {
    /// ゲートウェイのサービス種別（無効なら None）
    pub fn service_kind(&self) -> Option<ServiceKind> {
        match self {
            Gateway::Traefik => Some(ServiceKind::Traefik),
            Gateway::NginxProxyManager => Some(ServiceKind::NginxProxyManager),
            Gateway::Disabled => None,
        }
    }
}

/// イメージ参照
pub fn image(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Jellyfin => "lscr.io/linuxserver/jellyfin:latest",
        ServiceKind::Plex => "lscr.io/linuxserver/plex:latest",
        ServiceKind::Emby => "lscr.io/linuxserver/emby:latest",
        ServiceKind::Radarr => "lscr.io/linuxserver/radarr:latest",
        ServiceKind::Sonarr => "lscr.io/linuxserver/sonarr:latest",
        ServiceKind::Lidarr => "lscr.io/linuxserver/lidarr:latest",
        // readarr は develop タグのみ公開されている
        ServiceKind::Readarr => "lscr.io/linuxserver/readarr:develop",
        ServiceKind::Prowlarr => "lscr.io/linuxserver/prowlarr:latest",
        ServiceKind::Bazarr => "lscr.io/linuxserver/bazarr:latest",
        ServiceKind::Qbittorrent => "lscr.io/linuxserver/qbittorrent:latest",
        ServiceKind::Sabnzbd => "lscr.io/linuxserver/sabnzbd:latest",
        ServiceKind::Nzbget => "lscr.io/linuxserver/nzbget:latest",
        ServiceKind::Traefik => "traefik:latest",
        ServiceKind::NginxProxyManager => "jc21/nginx-proxy-manager:latest",
        ServiceKind::Homepage => "ghcr.io/gethomepage/homepage:latest",
        ServiceKind::Heimdall => "lscr.io/linuxserver/heimdall:latest",
        ServiceKind::Watchtower => "containrrr/watchtower:latest",
        ServiceKind::Portainer => "portainer/portainer-ce:latest",
        ServiceKind::Overseerr => "lscr.io/linuxserver/overseerr:latest",
        ServiceKind::Jellyseerr => "fallenbagel/jellyseerr:latest",
        ServiceKind::Tautulli => "lscr.io/linuxserver/tautulli:latest",
        ServiceKind::Gluetun => "qmcgaw/gluetun:latest",
    }
}

/// コンテナ内の待ち受けポートを環境変数で変えられる場合、その変数名
///
/// SABnzbd のようにイメージ側で 8080 に固定されているものは None。
pub fn listen_port_env(kind: ServiceKind) -> Option<&'static str> {
    match kind {
        ServiceKind::Qbittorrent => Some(QBITTORRENT_PORT_ENV),
        _ => None,
    }
}

/// サービスのテンプレートを作る
pub fn template(kind: ServiceKind, config: &StackConfig) -> ServiceDefinition {
    let mut service = ServiceDefinition::new(kind, image(kind));
    let config_dir = config.config_dir(kind.name());
    let media = |dir: &str| Volume::bind(config.media_dir(dir), format!("/{}", dir));

    match kind {
        ServiceKind::Jellyfin | ServiceKind::Emby => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(8096, 8096)];
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                media("movies"),
                media("tv"),
                media("music"),
            ];
            service.web = Some(WebEndpoint::new(kind, 8096, "メディアサーバー"));
        }
        ServiceKind::Plex => {
            linuxserver_env(&mut service, config);
            service
                .environment
                .insert("VERSION".to_string(), "docker".to_string());
            service.network = NetworkAttachment::Host;
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                media("movies"),
                media("tv"),
                media("music"),
            ];
            service.web = Some(WebEndpoint::new(kind, 32400, "メディアサーバー"));
        }
        ServiceKind::Radarr
        | ServiceKind::Sonarr
        | ServiceKind::Lidarr
        | ServiceKind::Readarr => {
            let (port, description) = match kind {
                ServiceKind::Radarr => (7878, "映画の管理"),
                ServiceKind::Sonarr => (8989, "TV 番組の管理"),
                ServiceKind::Lidarr => (8686, "音楽の管理"),
                _ => (8787, "書籍の管理"),
            };
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(port, port)];
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                media("movies"),
                media("tv"),
                media("music"),
                media("books"),
                Volume::bind(config.downloads_root(), "/downloads"),
            ];
            service.web = Some(WebEndpoint::new(kind, port, description));
        }
        ServiceKind::Prowlarr => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(9696, 9696)];
            service.volumes = vec![Volume::bind(&config_dir, "/config")];
            service.web = Some(WebEndpoint::new(kind, 9696, "インデクサーの管理"));
        }
        ServiceKind::Bazarr => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(6767, 6767)];
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                media("movies"),
                media("tv"),
            ];
            service.web = Some(WebEndpoint::new(kind, 6767, "字幕の管理"));
        }
        ServiceKind::Qbittorrent => {
            linuxserver_env(&mut service, config);
            service
                .environment
                .insert(QBITTORRENT_PORT_ENV.to_string(), "8080".to_string());
            service.ports = vec![
                Port::tcp(8080, 8080),
                Port::tcp(6881, 6881),
                Port::udp(6881, 6881),
            ];
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                Volume::bind(
                    config.downloads_root().join("torrents"),
                    "/downloads/torrents",
                ),
            ];
            service.web = Some(WebEndpoint::new(kind, 8080, "トレントのダウンロード"));
        }
        ServiceKind::Sabnzbd | ServiceKind::Nzbget => {
            // SABnzbd の 8080 は qBittorrent と衝突するのでホスト側は 8085
            let port = match kind {
                ServiceKind::Sabnzbd => Port::tcp(8085, 8080),
                _ => Port::tcp(6789, 6789),
            };
            linuxserver_env(&mut service, config);
            service.ports = vec![port];
            service.volumes = vec![
                Volume::bind(&config_dir, "/config"),
                Volume::bind(config.downloads_root().join("usenet"), "/downloads/usenet"),
            ];
            service.web = Some(WebEndpoint::new(kind, port.host, "Usenet のダウンロード"));
        }
        ServiceKind::Traefik => {
            service.command = [
                "--api.dashboard=true",
                "--api.insecure=true",
                "--providers.docker=true",
                "--providers.docker.exposedbydefault=false",
                "--entrypoints.web.address=:80",
            ]
            .iter()
            .map(|arg| arg.to_string())
            .collect();
            service.ports = vec![Port::tcp(80, 80), Port::tcp(8081, 8080)];
            service.volumes = vec![
                Volume::read_only(DOCKER_SOCKET, DOCKER_SOCKET),
                Volume::bind(&config_dir, "/etc/traefik"),
            ];
            service.web = Some(WebEndpoint::new(kind, 8081, "リバースプロキシ"));
        }
        ServiceKind::NginxProxyManager => {
            service.ports = vec![Port::tcp(80, 80), Port::tcp(443, 443), Port::tcp(81, 81)];
            service.volumes = vec![
                Volume::bind(config_dir.join("data"), "/data"),
                Volume::bind(config_dir.join("letsencrypt"), "/etc/letsencrypt"),
            ];
            service.web = Some(WebEndpoint::new(kind, 81, "リバースプロキシ"));
        }
        ServiceKind::Homepage => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(3000, 3000)];
            service.volumes = vec![
                Volume::bind(&config_dir, "/app/config"),
                Volume::read_only(DOCKER_SOCKET, DOCKER_SOCKET),
            ];
        }
        ServiceKind::Heimdall => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(3000, 80)];
            service.volumes = vec![Volume::bind(&config_dir, "/config")];
        }
        ServiceKind::Watchtower => {
            service
                .environment
                .insert("WATCHTOWER_CLEANUP".to_string(), "true".to_string());
            // 毎日 4:00
            service
                .environment
                .insert("WATCHTOWER_SCHEDULE".to_string(), "0 0 4 * * *".to_string());
            service.volumes = vec![Volume::bind(DOCKER_SOCKET, DOCKER_SOCKET)];
        }
        ServiceKind::Portainer => {
            service.ports = vec![Port::tcp(9000, 9000)];
            service.volumes = vec![
                Volume::bind(DOCKER_SOCKET, DOCKER_SOCKET),
                Volume::bind(&config_dir, "/data"),
            ];
            service.web = Some(WebEndpoint::new(kind, 9000, "コンテナの管理"));
        }
        ServiceKind::Overseerr => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(5055, 5055)];
            service.volumes = vec![Volume::bind(&config_dir, "/config")];
            service.web = Some(WebEndpoint::new(kind, 5055, "メディアのリクエスト"));
        }
        ServiceKind::Jellyseerr => {
            service.environment.insert("TZ".to_string(), config.timezone.clone());
            service.ports = vec![Port::tcp(5055, 5055)];
            service.volumes = vec![Volume::bind(&config_dir, "/app/config")];
            service.web = Some(WebEndpoint::new(kind, 5055, "メディアのリクエスト"));
        }
        ServiceKind::Tautulli => {
            linuxserver_env(&mut service, config);
            service.ports = vec![Port::tcp(8181, 8181)];
            service.volumes = vec![Volume::bind(&config_dir, "/config")];
            service.web = Some(WebEndpoint::new(kind, 8181, "Plex の統計"));
        }
        ServiceKind::Gluetun => {
            service.cap_add = vec!["NET_ADMIN".to_string()];
            service.devices = vec![Device::passthrough("/dev/net/tun")];
            service.environment.insert("TZ".to_string(), config.timezone.clone());
            service
                .environment
                .insert("VPN_TYPE".to_string(), "openvpn".to_string());
            service.volumes = vec![Volume::bind(&config_dir, "/gluetun")];
        }
    }

    service
}

/// linuxserver.io イメージ共通の環境変数
fn linuxserver_env(service: &mut ServiceDefinition, config: &StackConfig) {
    service
        .environment
        .insert("PUID".to_string(), config.puid.to_string());
    service
        .environment
        .insert("PGID".to_string(), config.pgid.to_string());
    service
        .environment
        .insert("TZ".to_string(), config.timezone.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceClass;

    const ALL_KINDS: [ServiceKind; 22] = [
        ServiceKind::Jellyfin,
        ServiceKind::Plex,
        ServiceKind::Emby,
        ServiceKind::Radarr,
        ServiceKind::Sonarr,
        ServiceKind::Lidarr,
        ServiceKind::Readarr,
        ServiceKind::Prowlarr,
        ServiceKind::Bazarr,
        ServiceKind::Qbittorrent,
        ServiceKind::Sabnzbd,
        ServiceKind::Nzbget,
        ServiceKind::Traefik,
        ServiceKind::NginxProxyManager,
        ServiceKind::Homepage,
        ServiceKind::Heimdall,
        ServiceKind::Watchtower,
        ServiceKind::Portainer,
        ServiceKind::Overseerr,
        ServiceKind::Jellyseerr,
        ServiceKind::Tautulli,
        ServiceKind::Gluetun,
    ];

    #[test]
    fn test_template_names_match_kind() {
        let config = StackConfig::default();
        for kind in ALL_KINDS {
            let service = template(kind, &config);
            assert_eq!(service.name, kind.name());
            assert_eq!(service.image, image(kind));
            assert!(service.depends_on.is_empty());
        }
    }

    #[test]
    fn test_config_volumes_live_under_root() {
        let config = StackConfig::with_root("/srv/astro");
        for kind in ALL_KINDS {
            let service = template(kind, &config);
            for volume in &service.volumes {
                let host = volume.host.to_string_lossy();
                assert!(
                    config.owns(&volume.host) || host == DOCKER_SOCKET,
                    "{}: {}",
                    kind.name(),
                    host
                );
            }
        }
    }

    #[test]
    fn test_linuxserver_env() {
        let config = StackConfig {
            puid: 1001,
            pgid: 1002,
            timezone: "Asia/Tokyo".to_string(),
            ..StackConfig::default()
        };
        let sonarr = template(ServiceKind::Sonarr, &config);
        assert_eq!(sonarr.environment["PUID"], "1001");
        assert_eq!(sonarr.environment["PGID"], "1002");
        assert_eq!(sonarr.environment["TZ"], "Asia/Tokyo");
    }

    #[test]
    fn test_plex_uses_host_network() {
        let plex = template(ServiceKind::Plex, &StackConfig::default());
        assert_eq!(plex.network, NetworkAttachment::Host);
        assert!(plex.ports.is_empty());
        assert_eq!(plex.web.map(|w| w.port), Some(32400));
    }

    #[test]
    fn test_published_ports_do_not_collide() {
        // 同時に選べる組み合わせで最も大きいもの
        let config = StackConfig::default();
        let kinds = [
            ServiceKind::Jellyfin,
            ServiceKind::Radarr,
            ServiceKind::Sonarr,
            ServiceKind::Lidarr,
            ServiceKind::Readarr,
            ServiceKind::Prowlarr,
            ServiceKind::Bazarr,
            ServiceKind::Qbittorrent,
            ServiceKind::Sabnzbd,
            ServiceKind::NginxProxyManager,
            ServiceKind::Homepage,
            ServiceKind::Watchtower,
            ServiceKind::Portainer,
            ServiceKind::Jellyseerr,
        ];

        let mut seen = std::collections::HashSet::new();
        for kind in kinds {
            for port in template(kind, &config).ports {
                assert!(
                    seen.insert((port.host, port.protocol)),
                    "port {} is published twice",
                    port
                );
            }
        }
    }

    #[test]
    fn test_listen_port_env_matches_template() {
        let config = StackConfig::default();
        for kind in ALL_KINDS {
            let Some(env) = listen_port_env(kind) else {
                continue;
            };
            let service = template(kind, &config);
            let listen: u16 = service.environment[env].parse().unwrap();
            assert!(service.ports.iter().any(|p| p.container == listen));
        }
        assert_eq!(listen_port_env(ServiceKind::Sabnzbd), None);
    }

    #[test]
    fn test_downloaders_are_downloader_class() {
        for kind in [
            ServiceKind::Qbittorrent,
            ServiceKind::Sabnzbd,
            ServiceKind::Nzbget,
        ] {
            assert_eq!(kind.class(), ServiceClass::Downloader);
        }
    }
}
