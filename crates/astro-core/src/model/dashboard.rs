//! ダッシュボードの表示項目

use super::selection::Dashboard;
use super::service::{ServiceClass, ServiceDefinition};
use serde::{Deserialize, Serialize};

/// ダッシュボード上のグループ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DashboardGroup {
    Media,
    Downloads,
    Management,
    System,
}

impl DashboardGroup {
    /// 表示順
    pub const ALL: [DashboardGroup; 4] = [
        Self::Media,
        Self::Downloads,
        Self::Management,
        Self::System,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Media => "Media",
            Self::Downloads => "Downloads",
            Self::Management => "Management",
            Self::System => "System",
        }
    }

    /// グリッドの列数
    pub fn columns(&self) -> u8 {
        match self {
            Self::Media => 3,
            Self::Downloads => 2,
            Self::Management => 4,
            Self::System => 2,
        }
    }

    pub fn for_class(class: ServiceClass) -> Self {
        match class {
            ServiceClass::MediaServer | ServiceClass::MediaCompanion => Self::Media,
            ServiceClass::Downloader | ServiceClass::Vpn => Self::Downloads,
            ServiceClass::Management => Self::Management,
            ServiceClass::Gateway | ServiceClass::Dashboard | ServiceClass::Utility => {
                Self::System
            }
        }
    }
}

/// ダッシュボードの1項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntry {
    /// サービス名（= コンテナ名）
    pub name: String,
    pub display_name: String,
    pub group: DashboardGroup,
    pub url: String,
    pub icon: String,
    pub description: String,
}

impl DashboardEntry {
    /// Web UI を持つサービスから項目を作る
    pub fn from_service(service: &ServiceDefinition, address: &str) -> Option<Self> {
        let web = service.web.as_ref()?;
        Some(Self {
            name: service.name.clone(),
            display_name: service.kind.display_name().to_string(),
            group: DashboardGroup::for_class(service.class()),
            url: format!("http://{}:{}", address, web.port),
            icon: web.icon.clone(),
            description: web.description.clone(),
        })
    }
}

/// ダッシュボードの構成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardPlan {
    pub kind: Dashboard,
    /// URL に埋め込むホストアドレス
    pub server_address: String,
    pub entries: Vec<DashboardEntry>,
}

impl DashboardPlan {
    pub fn entries_in(&self, group: DashboardGroup) -> impl Iterator<Item = &DashboardEntry> {
        self.entries.iter().filter(move |e| e.group == group)
    }
}
