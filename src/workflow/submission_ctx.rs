//! 提交处理上下文
//!
//! 封装"我正在处理哪道题的哪一次 Accepted"这一信息

use std::fmt::Display;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::models::{ProblemMetadata, ProblemUrl};

/// 导航时启动、可被多次等待的元数据抓取
pub type MetadataFuture = Shared<BoxFuture<'static, ProblemMetadata>>;

/// 把任意元数据 future 包装成可共享的形式
pub fn share_metadata<F>(future: F) -> MetadataFuture
where
    F: std::future::Future<Output = ProblemMetadata> + Send + 'static,
{
    future.boxed().shared()
}

/// 提交处理上下文
#[derive(Clone)]
pub struct SubmissionCtx {
    /// 题目规范地址
    pub url: ProblemUrl,

    /// 本题的元数据抓取
    pub metadata: MetadataFuture,

    /// 检测到 Accepted 的时间（仅用于日志显示）
    pub detected_at: DateTime<Utc>,
}

impl SubmissionCtx {
    pub fn new(url: ProblemUrl, metadata: MetadataFuture, detected_at: DateTime<Utc>) -> Self {
        Self {
            url,
            metadata,
            detected_at,
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[题目 {} @{}]", self.url.path, self.detected_at.format("%H:%M:%S"))
    }
}
