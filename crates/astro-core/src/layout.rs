//! スタックの設定とディスクレイアウト
//!
//! 各ステージには同じ `StackConfig` を渡します。実行中に変更されることはありません。

use std::path::{Path, PathBuf};

/// メディア種別ごとのライブラリディレクトリ
pub const MEDIA_DIRS: [&str; 4] = ["movies", "tv", "music", "books"];
/// ダウンロード先ディレクトリ
pub const DOWNLOAD_DIRS: [&str; 2] = ["torrents", "usenet"];

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const ANSWERS_FILE: &str = "astro-answers.yaml";

/// VPN の認証情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnCredentials {
    pub user: String,
    pub password: String,
}

/// スタック全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// 全データのルート (`/opt/astro`)
    pub root: PathBuf,
    pub puid: u32,
    pub pgid: u32,
    pub timezone: String,
    pub network_name: String,
    /// ダッシュボードの URL に使うアドレス（未指定なら検出結果を使う）
    pub server_address: Option<String>,
    pub vpn_credentials: Option<VpnCredentials>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/opt/astro"),
            puid: 1000,
            pgid: 1000,
            timezone: "America/New_York".to_string(),
            network_name: "astro-network".to_string(),
            server_address: None,
            vpn_credentials: None,
        }
    }
}

impl StackConfig {
    /// 指定ルートで既定値の設定を作る
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn config_root(&self) -> PathBuf {
        self.root.join("config")
    }

    /// サービスごとの設定ディレクトリ (`<root>/config/<name>`)
    pub fn config_dir(&self, service: &str) -> PathBuf {
        self.config_root().join(service)
    }

    pub fn media_root(&self) -> PathBuf {
        self.root.join("media")
    }

    pub fn media_dir(&self, kind: &str) -> PathBuf {
        self.media_root().join(kind)
    }

    pub fn downloads_root(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn compose_path(&self) -> PathBuf {
        self.root.join(COMPOSE_FILE)
    }

    pub fn answers_path(&self) -> PathBuf {
        self.root.join(ANSWERS_FILE)
    }

    /// 常に作成するディレクトリ（親から順）
    pub fn fixed_layout(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.root.clone(), self.config_root(), self.media_root()];
        dirs.extend(MEDIA_DIRS.iter().map(|d| self.media_dir(d)));
        dirs.push(self.downloads_root());
        dirs.extend(DOWNLOAD_DIRS.iter().map(|d| self.downloads_root().join(d)));
        dirs
    }

    /// パスがルート配下か
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}
