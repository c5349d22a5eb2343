//! ポート定義

use serde::{Deserialize, Serialize};
use std::fmt;

/// ポート定義
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub host: u16,
    pub container: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

/// プロトコル種別
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Port {
    pub const fn tcp(host: u16, container: u16) -> Self {
        Self {
            host,
            container,
            protocol: Protocol::Tcp,
        }
    }

    pub const fn udp(host: u16, container: u16) -> Self {
        Self {
            host,
            container,
            protocol: Protocol::Udp,
        }
    }
}

/// Compose の短縮記法 (`8080:80`, `6881:6881/udp`)
impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::Tcp => write!(f, "{}:{}", self.host, self.container),
            Protocol::Udp => write!(f, "{}:{}/udp", self.host, self.container),
        }
    }
}
