//! 提交处理流程 - 流程层
//!
//! 核心职责：定义"一次 Accepted"的完整处理流程
//!
//! 流程顺序：
//! 1. 检查是否开启自动提交
//! 2. 提取语言和代码（失败时等待后重试一次）
//! 3. 等待元数据，组装完整记录
//! 4. 可选地询问提交说明
//! 5. 提交到仓库 → 提示 + 通知协调器计数
//! 6. 任一步失败：提示 + 写入失败记录

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::RemoteRepository;
use crate::error::{AppError, ExtractionError};
use crate::models::{ProblemRecord, Request};
use crate::orchestrator::MessageClient;
use crate::services::{ExtractedCode, FailureLog, Notifier, ProblemExtractor, ToastKind};
use crate::storage::StateStore;
use crate::utils::truncate_text;
use crate::workflow::submission_ctx::SubmissionCtx;

/// 提示中错误信息的最大长度
const TOAST_ERROR_LEN: usize = 100;

/// 提交处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowResult {
    /// 已提交到仓库
    Submitted,
    /// 自动提交已关闭
    Disabled,
    /// 记录不完整，未提交
    ExtractionFailed,
    /// 仓库提交失败
    SubmitFailed,
}

/// 提交处理流程
///
/// - 编排完整的提交流程
/// - 不持有 page，只依赖业务能力（services / clients）
pub struct SubmissionFlow {
    extractor: Arc<ProblemExtractor>,
    repository: Arc<dyn RemoteRepository>,
    notifier: Arc<dyn Notifier>,
    failure_log: FailureLog,
    store: Arc<StateStore>,
    messages: MessageClient,
    retry_delay: Duration,
}

impl SubmissionFlow {
    pub fn new(
        extractor: Arc<ProblemExtractor>,
        repository: Arc<dyn RemoteRepository>,
        notifier: Arc<dyn Notifier>,
        failure_log: FailureLog,
        store: Arc<StateStore>,
        messages: MessageClient,
        retry_delay: Duration,
    ) -> Self {
        Self {
            extractor,
            repository,
            notifier,
            failure_log,
            store,
            messages,
            retry_delay,
        }
    }

    pub async fn run(&self, ctx: &SubmissionCtx) -> FlowResult {
        let state = match self.store.snapshot() {
            Ok(state) => state,
            Err(e) => {
                warn!("{} 读取本地状态失败，使用默认设置: {}", ctx, e);
                Default::default()
            }
        };

        if !state.code_submit() {
            info!("{} 自动提交已关闭，跳过", ctx);
            return FlowResult::Disabled;
        }

        // ========== 语言与代码 ==========
        let Some(extracted) = self.extract_with_retry(ctx).await else {
            self.report_failure(ctx, &ExtractionError::CodeOrLanguageMissing.into()).await;
            return FlowResult::ExtractionFailed;
        };

        // ========== 元数据 ==========
        let metadata = ctx.metadata.clone().await;
        let mut record = ProblemRecord::for_url(&ctx.url);
        record.apply_metadata(&metadata);
        record.source_code = extracted.code;
        record.language = extracted.language;

        let missing = record.missing_fields();
        if !missing.is_empty() {
            self.report_failure(ctx, &ExtractionError::IncompleteRecord { missing }.into())
                .await;
            return FlowResult::ExtractionFailed;
        }

        // ========== 提交 ==========
        let comment = if state.comment_submission() {
            self.notifier.prompt_comment().await
        } else {
            String::new()
        };

        info!("{} 📤 提交 {} ({})", ctx, record.slug, record.language.display_label);
        match self.repository.submit(&record, &comment).await {
            Ok(()) => {
                info!("{} ✓ 提交成功", ctx);
                self.notifier
                    .show_toast(&format!("题目 {} 已同步", record.slug), ToastKind::Success)
                    .await;

                let response = self
                    .messages
                    .send(Request::UpdateDifficultyStats {
                        difficulty: Some(record.difficulty.as_str().to_string()),
                    })
                    .await;
                if !response.success {
                    warn!("{} 计数更新失败: {:?}", ctx, response.error);
                }
                FlowResult::Submitted
            }
            Err(e) => {
                self.report_failure(ctx, &e).await;
                FlowResult::SubmitFailed
            }
        }
    }

    /// 提取一次，不完整时等待后再试一次
    async fn extract_with_retry(&self, ctx: &SubmissionCtx) -> Option<ExtractedCode> {
        let first = self.extractor.extract_language_and_code().await;
        if first.is_complete() {
            return Some(first);
        }

        warn!(
            "{} 代码或语言缺失，{}ms 后重试...",
            ctx,
            self.retry_delay.as_millis()
        );
        sleep(self.retry_delay).await;

        let second = self.extractor.extract_language_and_code().await;
        second.is_complete().then_some(second)
    }

    async fn report_failure(&self, ctx: &SubmissionCtx, error: &AppError) {
        let message = error.to_string();
        warn!("{} ❌ 同步失败: {}", ctx, message);

        self.notifier
            .show_toast(
                &format!("同步失败: {}", truncate_text(&message, TOAST_ERROR_LEN)),
                ToastKind::Error,
            )
            .await;

        if let Err(e) = self.failure_log.record(Utc::now(), &ctx.url.path, &message).await {
            warn!("写入失败记录出错: {}", e);
        }
    }
}
