//! スタックアセンブラー
//!
//! `Selection` と検出結果から `StackPlan` を組み立てる純粋関数です。
//! 同じ入力からは常に同じ計画が得られます。

use crate::catalog::{self, ALWAYS_ON};
use crate::layout::StackConfig;
use crate::model::{
    Addon, Choice, Dashboard, DashboardEntry, DashboardPlan, Device, GpuVendor, MediaServer,
    NetworkAttachment, NetworkDeclaration, Notice, ProbedCapabilities, Protocol, Selection,
    ServiceDefinition, ServiceKind, StackPlan, Transcoding,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// アドレスが分からないときの URL ホスト
pub const FALLBACK_ADDRESS: &str = "localhost";

/// スタック計画を組み立てる
///
/// 起動順は VPN、メディアサーバー、管理スイート、ダウンローダー、
/// ゲートウェイ、ダッシュボード、watchtower、追加サービスの順です。
pub fn assemble(
    selection: &Selection,
    capabilities: &ProbedCapabilities,
    config: &StackConfig,
) -> StackPlan {
    let mut notices = Vec::new();
    let mut services = Vec::new();

    let use_vpn = vpn_enabled(selection, config, &mut notices);
    if use_vpn {
        services.push(catalog::template(ServiceKind::Gluetun, config));
    }

    let media_kind = ServiceKind::from(selection.media_server);
    let mut media_server = catalog::template(media_kind, config);
    apply_transcoding(&mut media_server, selection.transcoding, capabilities, &mut notices);
    services.push(media_server);

    let (suite, watchtower) = ALWAYS_ON.split_at(ALWAYS_ON.len() - 1);
    services.extend(suite.iter().map(|&kind| catalog::template(kind, config)));

    if let Some(torrent) = selection.torrent {
        services.push(catalog::template(torrent.into(), config));
    }
    if let Some(usenet) = selection.usenet {
        services.push(catalog::template(usenet.into(), config));
    }

    if let Some(kind) = selection.gateway.service_kind() {
        services.push(catalog::template(kind, config));
    }

    let server_address = config
        .server_address
        .clone()
        .or_else(|| capabilities.host_address.clone())
        .unwrap_or_else(|| FALLBACK_ADDRESS.to_string());

    let mut dashboard = catalog::template(selection.dashboard.into(), config);
    if selection.dashboard == Dashboard::Homepage {
        dashboard
            .environment
            .insert("HOMEPAGE_VAR_SERVER_IP".to_string(), server_address.clone());
        dashboard
            .environment
            .insert("HOMEPAGE_ALLOWED_HOSTS".to_string(), "*".to_string());
    }
    services.push(dashboard);

    services.extend(watchtower.iter().map(|&kind| catalog::template(kind, config)));

    for addon in &selection.addons {
        if let Some(service) = addon_service(*addon, selection.media_server, config, &mut notices)
        {
            services.push(service);
        }
    }

    if use_vpn {
        route_through_vpn(&mut services, selection, config);
    }

    let entries = services
        .iter()
        .filter_map(|s| DashboardEntry::from_service(s, &server_address))
        .collect();

    let plan = StackPlan {
        services,
        network: NetworkDeclaration {
            name: config.network_name.clone(),
            external: capabilities.network_exists,
        },
        dashboard: DashboardPlan {
            kind: selection.dashboard,
            server_address,
            entries,
        },
        notices,
    };

    info!(
        services = plan.services.len(),
        notices = plan.notices.len(),
        vpn = use_vpn,
        "Assembled stack plan"
    );

    plan
}

/// VPN を使うかどうか（使えない場合は Notice を記録）
fn vpn_enabled(selection: &Selection, config: &StackConfig, notices: &mut Vec<Notice>) -> bool {
    if selection.vpn.is_none() {
        return false;
    }
    if !selection.has_downloader() {
        notices.push(Notice::VpnWithoutDownloader);
        return false;
    }
    if config.vpn_credentials.is_none() {
        notices.push(Notice::VpnCredentialsMissing);
        return false;
    }
    true
}

fn apply_transcoding(
    service: &mut ServiceDefinition,
    requested: Transcoding,
    capabilities: &ProbedCapabilities,
    notices: &mut Vec<Notice>,
) {
    let vendor = match requested {
        Transcoding::Software => return,
        Transcoding::Nvidia => GpuVendor::Nvidia,
        Transcoding::Intel => GpuVendor::Intel,
    };

    if !capabilities.has_gpu(vendor) {
        debug!(requested = requested.id(), "GPU not detected, falling back");
        notices.push(Notice::TranscodingFallback { requested });
        return;
    }

    match vendor {
        GpuVendor::Nvidia => {
            service.runtime = Some("nvidia".to_string());
            service
                .environment
                .insert("NVIDIA_VISIBLE_DEVICES".to_string(), "all".to_string());
            service
                .environment
                .insert("NVIDIA_DRIVER_CAPABILITIES".to_string(), "all".to_string());
        }
        GpuVendor::Intel => {
            service.devices.push(Device::passthrough("/dev/dri"));
        }
    }
}

fn addon_service(
    addon: Addon,
    media_server: MediaServer,
    config: &StackConfig,
    notices: &mut Vec<Notice>,
) -> Option<ServiceDefinition> {
    if !addon.supports(media_server) {
        notices.push(Notice::AddonUnsupported {
            addon,
            media_server,
        });
        return None;
    }

    let service = match addon {
        Addon::Bazarr => {
            let mut bazarr = catalog::template(ServiceKind::Bazarr, config);
            bazarr.depend_on(ServiceKind::Radarr.name());
            bazarr.depend_on(ServiceKind::Sonarr.name());
            bazarr
        }
        Addon::Requests => {
            let kind = match media_server {
                MediaServer::Plex => ServiceKind::Overseerr,
                MediaServer::Jellyfin | MediaServer::Emby => ServiceKind::Jellyseerr,
            };
            let mut requests = catalog::template(kind, config);
            requests.depend_on(ServiceKind::from(media_server).name());
            requests
        }
        Addon::Tautulli => {
            let mut tautulli = catalog::template(ServiceKind::Tautulli, config);
            tautulli.depend_on(ServiceKind::Plex.name());
            tautulli
        }
        Addon::Portainer => catalog::template(ServiceKind::Portainer, config),
    };

    Some(service)
}

/// ダウンローダーを gluetun のネットワーク名前空間に入れる
///
/// 公開ポートは gluetun 側に移します。名前空間を共有するので、コンテナ側の
/// ポートが重なる場合は待ち受けポートを変えられるサービスの方をずらします。
fn route_through_vpn(services: &mut [ServiceDefinition], selection: &Selection, config: &StackConfig) {
    let gluetun_name = ServiceKind::Gluetun.name();

    // 待ち受けポートを動かせないサービスが先に確保する
    let mut taken: BTreeSet<(u16, Protocol)> = services
        .iter()
        .filter(|s| s.is_downloader() && catalog::listen_port_env(s.kind).is_none())
        .flat_map(|s| s.ports.iter().map(|p| (p.container, p.protocol)))
        .collect();

    let mut hoisted = Vec::new();
    for service in services.iter_mut().filter(|s| s.is_downloader()) {
        if let Some(env) = catalog::listen_port_env(service.kind) {
            relocate_listener(service, env, &mut taken);
        }
        hoisted.append(&mut service.ports);
        service.network = NetworkAttachment::Service(gluetun_name.to_string());
        service.depend_on(gluetun_name);
    }

    if let Some(gluetun) = services.iter_mut().find(|s| s.kind == ServiceKind::Gluetun) {
        gluetun.ports = hoisted;
        if let (Some(provider), Some(credentials)) = (selection.vpn, &config.vpn_credentials) {
            gluetun.environment.insert(
                "VPN_SERVICE_PROVIDER".to_string(),
                provider.gluetun_name().to_string(),
            );
            gluetun
                .environment
                .insert("OPENVPN_USER".to_string(), credentials.user.clone());
            gluetun
                .environment
                .insert("OPENVPN_PASSWORD".to_string(), credentials.password.clone());
        }
    }
}

/// 待ち受けポートが使用済みなら空いている番号に移す（ホスト側はそのまま）
fn relocate_listener(
    service: &mut ServiceDefinition,
    env: &str,
    taken: &mut BTreeSet<(u16, Protocol)>,
) {
    let listen = service
        .environment
        .get(env)
        .and_then(|value| value.parse::<u16>().ok());

    for port in &mut service.ports {
        let clashes = taken.contains(&(port.container, port.protocol));
        if clashes && port.protocol == Protocol::Tcp && Some(port.container) == listen {
            let free = (port.container.saturating_add(1)..=u16::MAX)
                .find(|candidate| !taken.contains(&(*candidate, Protocol::Tcp)));
            if let Some(free) = free {
                debug!(
                    service = %service.name,
                    from = port.container,
                    to = free,
                    "Relocating listener inside VPN namespace"
                );
                port.container = free;
                service.environment.insert(env.to_string(), free.to_string());
            }
        }
        taken.insert((port.container, port.protocol));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VpnCredentials;
    use crate::model::{TorrentClient, UsenetClient, VpnProvider};
    use std::collections::BTreeSet;

    fn vpn_config() -> StackConfig {
        StackConfig {
            vpn_credentials: Some(VpnCredentials {
                user: "user".to_string(),
                password: "secret".to_string(),
            }),
            ..StackConfig::default()
        }
    }

    #[test]
    fn test_default_selection() {
        let plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        let names: Vec<&str> = plan.service_names().collect();
        assert_eq!(
            names,
            vec![
                "jellyfin",
                "radarr",
                "sonarr",
                "lidarr",
                "readarr",
                "prowlarr",
                "qbittorrent",
                "traefik",
                "homepage",
                "watchtower",
                "bazarr",
                "portainer",
            ]
        );
        assert!(plan.notices.is_empty());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_vpn_routes_downloaders() {
        let selection = Selection {
            torrent: Some(TorrentClient::Qbittorrent),
            usenet: Some(UsenetClient::Sabnzbd),
            vpn: Some(VpnProvider::Mullvad),
            ..Selection::default()
        };

        let plan = assemble(&selection, &ProbedCapabilities::default(), &vpn_config());

        assert_eq!(plan.services[0].name, "gluetun");
        let gluetun = &plan.services[0];
        assert_eq!(gluetun.environment["VPN_SERVICE_PROVIDER"], "mullvad");
        assert_eq!(gluetun.environment["OPENVPN_PASSWORD"], "secret");

        for name in ["qbittorrent", "sabnzbd"] {
            let service = plan.service(name).unwrap();
            assert!(service.ports.is_empty());
            assert_eq!(
                service.network,
                NetworkAttachment::Service("gluetun".to_string())
            );
            assert_eq!(service.depends_on, vec!["gluetun".to_string()]);
        }

        // SABnzbd は 8080 固定なので qBittorrent の WebUI が 8081 にずれる
        let ports: Vec<String> = gluetun.ports.iter().map(ToString::to_string).collect();
        assert_eq!(
            ports,
            vec!["8080:8081", "6881:6881", "6881:6881/udp", "8085:8080"]
        );
        let qbittorrent = plan.service("qbittorrent").unwrap();
        assert_eq!(qbittorrent.environment["WEBUI_PORT"], "8081");
        assert_eq!(qbittorrent.web.as_ref().map(|w| w.port), Some(8080));

        // ダウンローダー以外は影響を受けない
        let radarr = plan.service("radarr").unwrap();
        assert_eq!(radarr.network, NetworkAttachment::Default);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_vpn_keeps_listener_without_clash() {
        let selection = Selection {
            torrent: Some(TorrentClient::Qbittorrent),
            usenet: Some(UsenetClient::Nzbget),
            vpn: Some(VpnProvider::Mullvad),
            ..Selection::default()
        };

        let plan = assemble(&selection, &ProbedCapabilities::default(), &vpn_config());

        let gluetun = plan.service("gluetun").unwrap();
        let ports: Vec<String> = gluetun.ports.iter().map(ToString::to_string).collect();
        assert_eq!(
            ports,
            vec!["8080:8080", "6881:6881", "6881:6881/udp", "6789:6789"]
        );
        assert_eq!(
            plan.service("qbittorrent").unwrap().environment["WEBUI_PORT"],
            "8080"
        );
    }

    #[test]
    fn test_vpn_without_credentials_is_dropped() {
        let selection = Selection {
            vpn: Some(VpnProvider::NordVpn),
            ..Selection::default()
        };

        let plan = assemble(
            &selection,
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        assert!(plan.service("gluetun").is_none());
        assert!(!plan.routes_through_vpn());
        assert_eq!(plan.notices, vec![Notice::VpnCredentialsMissing]);
    }

    #[test]
    fn test_vpn_without_downloader_is_dropped() {
        let selection = Selection {
            torrent: None,
            usenet: None,
            vpn: Some(VpnProvider::NordVpn),
            ..Selection::default()
        };

        let plan = assemble(&selection, &ProbedCapabilities::default(), &vpn_config());

        assert!(plan.service("gluetun").is_none());
        assert_eq!(plan.notices, vec![Notice::VpnWithoutDownloader]);
    }

    #[test]
    fn test_requests_follow_media_server() {
        let mut selection = Selection {
            addons: BTreeSet::from([Addon::Requests]),
            ..Selection::default()
        };

        let plan = assemble(
            &selection,
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );
        let jellyseerr = plan.service("jellyseerr").unwrap();
        assert_eq!(jellyseerr.depends_on, vec!["jellyfin".to_string()]);
        assert!(plan.service("overseerr").is_none());

        selection.media_server = MediaServer::Plex;
        let plan = assemble(
            &selection,
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );
        let overseerr = plan.service("overseerr").unwrap();
        assert_eq!(overseerr.depends_on, vec!["plex".to_string()]);
    }

    #[test]
    fn test_tautulli_dropped_without_plex() {
        let selection = Selection {
            media_server: MediaServer::Emby,
            addons: BTreeSet::from([Addon::Tautulli]),
            ..Selection::default()
        };

        let plan = assemble(
            &selection,
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        assert!(plan.service("tautulli").is_none());
        assert_eq!(
            plan.notices,
            vec![Notice::AddonUnsupported {
                addon: Addon::Tautulli,
                media_server: MediaServer::Emby,
            }]
        );
    }

    #[test]
    fn test_nvidia_transcoding() {
        let selection = Selection {
            transcoding: Transcoding::Nvidia,
            ..Selection::default()
        };
        let capabilities = ProbedCapabilities::default().with_gpu(GpuVendor::Nvidia);

        let plan = assemble(&selection, &capabilities, &StackConfig::default());
        let jellyfin = plan.service("jellyfin").unwrap();
        assert_eq!(jellyfin.runtime.as_deref(), Some("nvidia"));
        assert_eq!(jellyfin.environment["NVIDIA_VISIBLE_DEVICES"], "all");
        assert!(plan.notices.is_empty());

        // メディアサーバー以外には付かない
        assert!(plan.services.iter().filter(|s| s.runtime.is_some()).count() == 1);
    }

    #[test]
    fn test_server_address_precedence() {
        let capabilities = ProbedCapabilities {
            host_address: Some("192.168.1.20".to_string()),
            ..ProbedCapabilities::default()
        };

        let plan = assemble(&Selection::default(), &capabilities, &StackConfig::default());
        assert_eq!(plan.dashboard.server_address, "192.168.1.20");
        assert_eq!(
            plan.service("homepage").unwrap().environment["HOMEPAGE_VAR_SERVER_IP"],
            "192.168.1.20"
        );

        let config = StackConfig {
            server_address: Some("media.local".to_string()),
            ..StackConfig::default()
        };
        let plan = assemble(&Selection::default(), &capabilities, &config);
        assert_eq!(plan.dashboard.server_address, "media.local");

        let plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );
        assert_eq!(plan.dashboard.server_address, FALLBACK_ADDRESS);
    }

    #[test]
    fn test_dashboard_entries_skip_web_less_services() {
        let plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        let names: Vec<&str> = plan
            .dashboard
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert!(names.contains(&"sonarr"));
        assert!(!names.contains(&"watchtower"));
        assert!(!names.contains(&"homepage"));
    }

    #[test]
    fn test_existing_network_is_external() {
        let capabilities = ProbedCapabilities {
            network_exists: true,
            ..ProbedCapabilities::default()
        };
        let plan = assemble(&Selection::default(), &capabilities, &StackConfig::default());
        assert!(plan.network.external);
        assert_eq!(plan.network.name, "astro-network");
    }
}
