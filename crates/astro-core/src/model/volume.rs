//! ボリューム・デバイス定義

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// ボリューム定義（バインドマウント）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub host: PathBuf,
    pub container: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

impl Volume {
    pub fn bind(host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    pub fn read_only(host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::bind(host, container)
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container.display())?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// ホストデバイスのマッピング (`/dev/dri:/dev/dri`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl Device {
    /// ホストと同じパスでコンテナに渡す
    pub fn passthrough(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            host: path.clone(),
            container: path,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_short_syntax() {
        assert_eq!(
            Volume::bind("/opt/astro/config/sonarr", "/config").to_string(),
            "/opt/astro/config/sonarr:/config"
        );
        assert_eq!(
            Volume::read_only("/var/run/docker.sock", "/var/run/docker.sock").to_string(),
            "/var/run/docker.sock:/var/run/docker.sock:ro"
        );
    }

    #[test]
    fn test_device_passthrough() {
        assert_eq!(Device::passthrough("/dev/dri").to_string(), "/dev/dri:/dev/dri");
    }
}
