pub mod error;

pub use error::*;

use astro_container::RetryPolicy;
use astro_core::{StackConfig, VpnCredentials};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "ASTRO_CONFIG_PATH";
/// VPN 認証情報を上書きする環境変数
pub const VPN_USER_ENV: &str = "ASTRO_VPN_USER";
pub const VPN_PASSWORD_ENV: &str = "ASTRO_VPN_PASSWORD";

/// システム全体の設定ファイル
pub const SYSTEM_CONFIG_PATH: &str = "/etc/astro/astro.yaml";

/// VPN の認証情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnSettings {
    pub user: String,
    pub password: String,
}

/// astro.yaml
///
/// ```yaml
/// root: /opt/astro
/// puid: 1000
/// pgid: 1000
/// timezone: Asia/Tokyo
/// vpn:
///   user: p1234567
///   password: secret
/// readiness:
///   max_retries: 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub root: PathBuf,
    pub puid: u32,
    pub pgid: u32,
    pub timezone: String,
    pub network_name: String,
    /// ダッシュボードの URL に使うアドレス（未指定なら自動検出）
    pub server_address: Option<String>,
    pub vpn: Option<VpnSettings>,
    /// Docker の準備完了待ち
    pub readiness: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        let stack = StackConfig::default();
        Self {
            root: stack.root,
            puid: stack.puid,
            pgid: stack.pgid,
            timezone: stack.timezone,
            network_name: stack.network_name,
            server_address: None,
            vpn: None,
            readiness: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// 設定ファイルを読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// 設定を探して読み込む（見つからなければ既定値）
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match find_settings_file(explicit)? {
            Some(path) => {
                info!(path = %path.display(), "Loading settings");
                Self::from_file(&path)?
            }
            None => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        };
        // 環境変数で空の認証情報が入ることがあるので上書き後にも検証する
        let settings = settings.with_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// 環境変数による VPN 認証情報の上書き
    pub fn with_env_overrides(mut self) -> Self {
        if let (Ok(user), Ok(password)) = (
            std::env::var(VPN_USER_ENV),
            std::env::var(VPN_PASSWORD_ENV),
        ) {
            self.vpn = Some(VpnSettings { user, password });
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "root は絶対パスで指定してください: {}",
                self.root.display()
            )));
        }
        if self.timezone.trim().is_empty() {
            return Err(ConfigError::Invalid("timezone が空です".to_string()));
        }
        if self.network_name.trim().is_empty() {
            return Err(ConfigError::Invalid("network_name が空です".to_string()));
        }
        if self.readiness.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "readiness.max_retries は 1 以上にしてください".to_string(),
            ));
        }
        if let Some(vpn) = &self.vpn {
            if vpn.user.is_empty() || vpn.password.is_empty() {
                return Err(ConfigError::Invalid(
                    "vpn.user と vpn.password の両方を指定してください".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 各ステージに渡す不変の設定
    pub fn stack_config(&self) -> StackConfig {
        StackConfig {
            root: self.root.clone(),
            puid: self.puid,
            pgid: self.pgid,
            timezone: self.timezone.clone(),
            network_name: self.network_name.clone(),
            server_address: self.server_address.clone(),
            vpn_credentials: self.vpn.as_ref().map(|vpn| VpnCredentials {
                user: vpn.user.clone(),
                password: vpn.password.clone(),
            }),
        }
    }
}

/// ユーザーごとの設定ファイル (~/.config/astro/astro.yaml)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("astro").join("astro.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. `--config` で指定されたパス
/// 2. 環境変数 ASTRO_CONFIG_PATH
/// 3. /etc/astro/astro.yaml
/// 4. ~/.config/astro/astro.yaml
///
/// 1, 2 で指定されたファイルが存在しない場合はエラーです。
pub fn find_settings_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let candidates = [Some(PathBuf::from(SYSTEM_CONFIG_PATH)), user_config_path()];
    find_settings_file_in(explicit, candidates.into_iter().flatten())
}

fn find_settings_file_in(
    explicit: Option<&Path>,
    candidates: impl IntoIterator<Item = PathBuf>,
) -> Result<Option<PathBuf>> {
    // 1. 引数で直接指定
    if let Some(path) = explicit {
        return require(path.to_path_buf()).map(Some);
    }

    // 2. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        return require(PathBuf::from(config_path)).map(Some);
    }

    // 3, 4. 既定の場所
    Ok(candidates.into_iter().find(|path| path.is_file()))
}

fn require(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigError::NotFound { path })
    }
}
