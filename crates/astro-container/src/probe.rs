//! ホスト環境の検出
//!
//! GPU デバイス、既存のスタック用ネットワーク、ホストアドレスを調べます。
//! 検出は失敗しません。エラーは全て「存在しない」として扱います。

use astro_core::{GpuVendor, ProbedCapabilities};
use bollard::Docker;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// nvidia-smi の応答待ち時間
pub const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CapabilityProber {
    docker: Option<Docker>,
    network_name: String,
    dev_root: PathBuf,
    /// nvidia-smi / hostname を実行するか
    run_commands: bool,
}

impl CapabilityProber {
    pub fn new(docker: Option<Docker>, network_name: impl Into<String>) -> Self {
        Self {
            docker,
            network_name: network_name.into(),
            dev_root: PathBuf::from("/dev"),
            run_commands: true,
        }
    }

    /// デバイスを探すディレクトリを差し替える
    pub fn with_dev_root(mut self, dev_root: impl Into<PathBuf>) -> Self {
        self.dev_root = dev_root.into();
        self
    }

    /// 外部コマンドを実行しない
    pub fn without_commands(mut self) -> Self {
        self.run_commands = false;
        self
    }

    pub async fn probe(&self) -> ProbedCapabilities {
        let mut capabilities = ProbedCapabilities::default();

        if self.has_nvidia().await {
            capabilities.gpus.insert(GpuVendor::Nvidia);
        }
        if has_intel(&self.dev_root) {
            capabilities.gpus.insert(GpuVendor::Intel);
        }

        capabilities.network_exists = self.network_exists().await;
        capabilities.host_address = self.host_address().await;

        info!(
            gpus = ?capabilities.gpus,
            network_exists = capabilities.network_exists,
            host_address = ?capabilities.host_address,
            "Probed host capabilities"
        );

        capabilities
    }

    async fn has_nvidia(&self) -> bool {
        if self.dev_root.join("nvidia0").exists() {
            return true;
        }
        if !self.run_commands {
            return false;
        }

        match timeout(NVIDIA_SMI_TIMEOUT, Command::new("nvidia-smi").output()).await {
            Ok(Ok(output)) => output.status.success(),
            Ok(Err(e)) => {
                debug!(error = %e, "nvidia-smi not available");
                false
            }
            Err(_) => {
                debug!("nvidia-smi timed out");
                false
            }
        }
    }

    async fn network_exists(&self) -> bool {
        let Some(docker) = &self.docker else {
            return false;
        };

        docker
            .inspect_network(
                &self.network_name,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
            .is_ok()
    }

    async fn host_address(&self) -> Option<String> {
        if !self.run_commands {
            return None;
        }

        let output = Command::new("hostname").arg("-I").output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        parse_host_addresses(&String::from_utf8_lossy(&output.stdout))
    }
}

fn has_intel(dev_root: &Path) -> bool {
    dev_root.join("dri").join("renderD128").exists()
}

/// `hostname -I` の出力から先頭のアドレスを取り出す
pub fn parse_host_addresses(output: &str) -> Option<String> {
    output.split_whitespace().next().map(String::from)
}
