//! 失败记录服务 - 业务能力层
//!
//! 只负责"把处理失败的题目追加到文件"能力，不关心流程

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 失败记录服务
pub struct FailureLog {
    path: String,
}

impl FailureLog {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `at`: 发生时间
    /// - `problem`: 题目地址或 slug，未知时为空
    /// - `reason`: 失败原因
    pub async fn record(&self, at: DateTime<Utc>, problem: &str, reason: &str) -> Result<()> {
        debug!("写入失败记录: {} | {}", problem, reason);

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;

        let problem = if problem.is_empty() { "-" } else { problem };
        let line = format!("{} | {} | {}\n", at.to_rfc3339(), problem, reason.replace('\n', " "));
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
