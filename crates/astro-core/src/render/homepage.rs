//! Homepage ダッシュボードの設定ファイル
//!
//! `config/homepage/` 配下に services.yaml, settings.yaml, widgets.yaml, docker.yaml を生成します。

use super::RenderedFile;
use crate::error::{AstroError, Result};
use crate::model::{DashboardGroup, DashboardPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// docker.yaml に登録する Docker エンドポイント名
const DOCKER_SERVER: &str = "my-docker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomepageService {
    pub icon: String,
    pub href: String,
    pub description: String,
    pub server: String,
    pub container: String,
}

/// services.yaml: `- Group: [ - Name: {...} ]`
pub type HomepageServices = Vec<BTreeMap<String, Vec<BTreeMap<String, HomepageService>>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub style: String,
    pub columns: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomepageLayout {
    #[serde(rename = "Media")]
    pub media: LayoutEntry,
    #[serde(rename = "Downloads")]
    pub downloads: LayoutEntry,
    #[serde(rename = "Management")]
    pub management: LayoutEntry,
    #[serde(rename = "System")]
    pub system: LayoutEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageSettings {
    pub title: String,
    pub theme: String,
    pub color: String,
    pub header_style: String,
    pub layout: HomepageLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesWidget {
    pub cpu: bool,
    pub memory: bool,
    pub disk: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatetimeWidget {
    pub text_size: String,
    pub format: BTreeMap<String, String>,
}

/// widgets.yaml の1項目（どちらか一方だけを持つ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesWidget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DatetimeWidget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerEndpoint {
    pub socket: String,
}

fn layout_entry(group: DashboardGroup) -> LayoutEntry {
    LayoutEntry {
        style: "row".to_string(),
        columns: group.columns(),
    }
}

pub fn services(plan: &DashboardPlan) -> HomepageServices {
    DashboardGroup::ALL
        .iter()
        .filter_map(|&group| {
            let entries: Vec<_> = plan
                .entries_in(group)
                .map(|entry| {
                    BTreeMap::from([(
                        entry.display_name.clone(),
                        HomepageService {
                            icon: entry.icon.clone(),
                            href: entry.url.clone(),
                            description: entry.description.clone(),
                            server: DOCKER_SERVER.to_string(),
                            container: entry.name.clone(),
                        },
                    )])
                })
                .collect();

            if entries.is_empty() {
                None
            } else {
                Some(BTreeMap::from([(group.title().to_string(), entries)]))
            }
        })
        .collect()
}

pub fn settings() -> HomepageSettings {
    HomepageSettings {
        title: "AstroMediaServer".to_string(),
        theme: "dark".to_string(),
        color: "slate".to_string(),
        header_style: "boxed".to_string(),
        layout: HomepageLayout {
            media: layout_entry(DashboardGroup::Media),
            downloads: layout_entry(DashboardGroup::Downloads),
            management: layout_entry(DashboardGroup::Management),
            system: layout_entry(DashboardGroup::System),
        },
    }
}

pub fn widgets() -> Vec<WidgetEntry> {
    vec![
        WidgetEntry {
            resources: Some(ResourcesWidget {
                cpu: true,
                memory: true,
                disk: "/".to_string(),
            }),
            datetime: None,
        },
        WidgetEntry {
            resources: None,
            datetime: Some(DatetimeWidget {
                text_size: "xl".to_string(),
                format: BTreeMap::from([("timeStyle".to_string(), "short".to_string())]),
            }),
        },
    ]
}

pub fn docker() -> BTreeMap<String, DockerEndpoint> {
    BTreeMap::from([(
        DOCKER_SERVER.to_string(),
        DockerEndpoint {
            socket: "/var/run/docker.sock".to_string(),
        },
    )])
}

/// 4ファイルを生成
pub fn render(plan: &DashboardPlan) -> Result<Vec<RenderedFile>> {
    let dir = PathBuf::from("config").join("homepage");

    Ok(vec![
        RenderedFile::new(dir.join("services.yaml"), to_yaml(&services(plan))?),
        RenderedFile::new(dir.join("settings.yaml"), to_yaml(&settings())?),
        RenderedFile::new(dir.join("widgets.yaml"), to_yaml(&widgets())?),
        RenderedFile::new(dir.join("docker.yaml"), to_yaml(&docker())?),
    ])
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| AstroError::RenderError(e.to_string()))
}
