//! ホストの検出結果

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// GPU ベンダー
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Intel,
}

/// ホスト環境の検出結果
///
/// 検出に失敗した項目は「存在しない」として扱います。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbedCapabilities {
    pub gpus: BTreeSet<GpuVendor>,
    /// スタック用ネットワークが既に存在するか
    pub network_exists: bool,
    /// `hostname -I` の先頭アドレス
    pub host_address: Option<String>,
}

impl ProbedCapabilities {
    pub fn has_gpu(&self, vendor: GpuVendor) -> bool {
        self.gpus.contains(&vendor)
    }

    pub fn with_gpu(mut self, vendor: GpuVendor) -> Self {
        self.gpus.insert(vendor);
        self
    }
}
