//! 批量同步服务 - 业务能力层
//!
//! 把 LeetCode 上最近通过、仓库里还没有的题目补交到仓库。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clients::leetcode_session::SubmissionDetail;
use crate::clients::{RemoteRepository, SolvedSource};
use crate::error::AppResult;
use crate::models::{format_problem_name, language, Difficulty, ProblemRecord};

/// 最近通过列表的条数上限（接口本身最多返回 20 条）
pub const RECENT_LIMIT: u32 = 20;

/// 一次同步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

/// 可以被协调器调度的同步任务
#[async_trait]
pub trait SyncJob: Send + Sync {
    async fn run(&self) -> AppResult<SyncOutcome>;
}

/// 由一次提交详情构建完整记录
pub fn record_from_detail(detail: &SubmissionDetail) -> ProblemRecord {
    let question = &detail.question;
    let mut language = language::resolve(Some(&detail.lang.name));
    if !language.is_recognized() && !detail.lang.verbose_name.is_empty() {
        language = language::resolve(Some(&detail.lang.verbose_name));
    }

    ProblemRecord {
        slug: format_problem_name(&format!("{}. {}", question.question_frontend_id, question.title)),
        difficulty: Difficulty::parse(&question.difficulty),
        description: question.content.clone().unwrap_or_default(),
        canonical_url: format!("/problems/{}/", question.title_slug),
        source_code: detail.code.clone(),
        language,
    }
}

/// 已通过题目的批量同步
pub struct SolvedProblemSync {
    source: Arc<dyn SolvedSource>,
    repository: Arc<dyn RemoteRepository>,
}

impl SolvedProblemSync {
    pub fn new(source: Arc<dyn SolvedSource>, repository: Arc<dyn RemoteRepository>) -> Self {
        Self { source, repository }
    }
}

#[async_trait]
impl SyncJob for SolvedProblemSync {
    async fn run(&self) -> AppResult<SyncOutcome> {
        let Some(username) = self.source.signed_in_user().await? else {
            return Ok(SyncOutcome {
                success: false,
                message: "未登录 LeetCode，无法同步".to_string(),
            });
        };

        let mut tracked: HashSet<String> = self
            .repository
            .list_tracked_problems()
            .await
            .into_iter()
            .map(|p| p.problem_id)
            .collect();

        let recent = self.source.recent_accepted(&username, RECENT_LIMIT).await?;
        let mut seen_slugs = HashSet::new();
        let mut synced = 0usize;
        let mut skipped = 0usize;

        // 列表按时间倒序，同一道题只取最新一次
        for submission in recent.iter().filter(|s| seen_slugs.insert(s.title_slug.clone())) {
            let detail = self.source.submission_detail(&submission.id).await?;
            let problem_id = detail.question.question_frontend_id.trim_start_matches('0').to_string();
            if tracked.contains(&problem_id) {
                debug!("已在仓库中: {}", submission.title_slug);
                continue;
            }

            let record = record_from_detail(&detail);
            if !record.is_complete() {
                debug!("记录不完整，跳过 {}: 缺少 {:?}", submission.title_slug, record.missing_fields());
                skipped += 1;
                continue;
            }

            self.repository.submit(&record, "").await?;
            tracked.insert(problem_id);
            synced += 1;
            info!("✓ 已补交 {}", record.slug);
        }

        let message = if skipped > 0 {
            format!("同步完成: 新增 {} 道题，跳过 {} 道不完整的题", synced, skipped)
        } else {
            format!("同步完成: 新增 {} 道题", synced)
        };
        Ok(SyncOutcome { success: true, message })
    }
}
