//! 準備完了待機（Exponential Backoff）
//!
//! Docker デーモンやコンテナの準備完了を、上限付きのリトライで待機します。
//! 全ての待機処理は `retry_until` を共有します。

use crate::error::{ContainerError, Result};
use bollard::Docker;
use bollard::models::HealthStatusEnum;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// リトライ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最大試行回数
    pub max_retries: u32,
    /// 初期待機時間（ミリ秒）
    pub initial_delay_ms: u64,
    /// 最大待機時間（ミリ秒）
    pub max_delay_ms: u64,
    /// Exponential倍率
    pub multiplier: f64,
    /// 全体のタイムアウト（ミリ秒）
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            multiplier: 2.0,
            timeout_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// 指定回数目の待機時間を計算（ミリ秒）
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 条件が満たされるまでリトライ
///
/// 成功した試行の番号（1始まり）を返します。
/// 試行回数を使い切るか全体のタイムアウトに達すると `RuntimeNotReady` になります。
pub async fn retry_until<F, Fut>(policy: &RetryPolicy, target: &str, mut check: F) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut attempts = 0;

    let outcome = timeout(policy.timeout(), async {
        for attempt in 0..policy.max_retries {
            attempts = attempt + 1;
            if check().await {
                return true;
            }

            // 最後の試行でなければ待機
            if attempt + 1 < policy.max_retries {
                let delay_ms = policy.delay_for_attempt(attempt);
                debug!(target_name = target, attempt = attempts, delay_ms, "Not ready yet");
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }
        false
    })
    .await;

    match outcome {
        Ok(true) => {
            info!(target_name = target, attempts, "Ready");
            Ok(attempts)
        }
        Ok(false) | Err(_) => Err(ContainerError::RuntimeNotReady {
            target: target.to_string(),
            attempts,
        }),
    }
}

/// Docker デーモンが応答するまで待機
pub async fn wait_for_daemon(docker: &Docker, policy: &RetryPolicy) -> Result<()> {
    retry_until(policy, "Docker daemon", move || async move {
        docker.ping().await.is_ok()
    })
    .await?;
    Ok(())
}

/// 複数のコンテナが起動するまで待機
pub async fn wait_for_services(
    docker: &Docker,
    container_names: &[String],
    policy: &RetryPolicy,
) -> Result<()> {
    for container_name in container_names {
        retry_until(policy, container_name, move || async move {
            check_container_health(docker, container_name)
                .await
                .unwrap_or(false)
        })
        .await?;
    }
    Ok(())
}

/// コンテナのヘルス状態を確認
async fn check_container_health(docker: &Docker, container_name: &str) -> Result<bool> {
    let inspect_result = docker
        .inspect_container(
            container_name,
            None::<bollard::query_parameters::InspectContainerOptions>,
        )
        .await?;

    let Some(state) = inspect_result.state else {
        return Ok(false);
    };

    if !state.running.unwrap_or(false) {
        return Ok(false);
    }

    // ヘルスチェックが設定されている場合、そのステータスを確認
    if let Some(status) = state.health.and_then(|health| health.status) {
        return Ok(status == HealthStatusEnum::HEALTHY);
    }

    // ヘルスチェックがない場合はRunning状態で準備完了とみなす
    Ok(true)
}
