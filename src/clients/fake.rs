//! 测试用的远程服务替身

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::leetcode_session::{AcceptedSubmission, SubmissionDetail};
use crate::clients::{GrantedCredentials, OAuthExchange, ProblemCatalogue, RemoteRepository, SolvedSource};
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{CatalogueEntry, Difficulty, ProblemRecord, TrackedProblem};

/// 记录所有提交的仓库
#[derive(Default)]
pub struct FakeRepository {
    tracked: Mutex<Vec<TrackedProblem>>,
    submitted: Mutex<Vec<ProblemRecord>>,
    comments: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
    list_calls: AtomicUsize,
}

impl FakeRepository {
    pub fn with_tracked(entries: &[(&str, &str)]) -> Self {
        let repo = Self::default();
        *repo.tracked.lock().unwrap() = entries
            .iter()
            .map(|(name, id)| TrackedProblem {
                original_name: name.to_string(),
                problem_id: id.to_string(),
            })
            .collect();
        repo
    }

    pub fn fail_submits_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn submitted(&self) -> Vec<ProblemRecord> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteRepository for FakeRepository {
    async fn submit(&self, record: &ProblemRecord, comment: &str) -> AppResult<()> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AppError::Other(message));
        }
        self.submitted.lock().unwrap().push(record.clone());
        self.comments.lock().unwrap().push(comment.to_string());
        Ok(())
    }

    async fn list_tracked_problems(&self) -> Vec<TrackedProblem> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.tracked.lock().unwrap().clone()
    }
}

/// 固定内容的题库
#[derive(Default)]
pub struct FakeCatalogue {
    entries: Vec<CatalogueEntry>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeCatalogue {
    pub fn with_entries(entries: &[(&str, Difficulty)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(id, difficulty)| CatalogueEntry {
                    problem_id: id.to_string(),
                    title_slug: String::new(),
                    difficulty: *difficulty,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProblemCatalogue for FakeCatalogue {
    async fn fetch_catalogue(&self) -> AppResult<Vec<CatalogueEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::bad_response("/api/problems/all/", 503, "unavailable"));
        }
        Ok(self.entries.clone())
    }
}

/// 内存中的 LeetCode 会话
#[derive(Default)]
pub struct FakeSolvedSource {
    username: Option<String>,
    submissions: Mutex<Vec<(AcceptedSubmission, SubmissionDetail)>>,
    detail_requests: Mutex<Vec<String>>,
}

impl FakeSolvedSource {
    pub fn signed_in(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// 按时间倒序追加
    pub fn add(&self, submission: AcceptedSubmission, detail: SubmissionDetail) {
        self.submissions.lock().unwrap().push((submission, detail));
    }

    pub fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SolvedSource for FakeSolvedSource {
    async fn signed_in_user(&self) -> AppResult<Option<String>> {
        Ok(self.username.clone())
    }

    async fn recent_accepted(&self, _username: &str, limit: u32) -> AppResult<Vec<AcceptedSubmission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .map(|(s, _)| s.clone())
            .collect())
    }

    async fn submission_detail(&self, submission_id: &str) -> AppResult<SubmissionDetail> {
        self.detail_requests.lock().unwrap().push(submission_id.to_string());
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s.id == submission_id)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| AppError::Other(format!("no submission {}", submission_id)))
    }
}

/// 只接受一个授权码的 OAuth
pub struct FakeOAuth {
    pub valid_code: String,
    pub granted: GrantedCredentials,
    pub calls: AtomicUsize,
}

impl FakeOAuth {
    pub fn new(valid_code: &str, username: &str, token: &str) -> Self {
        Self {
            valid_code: valid_code.to_string(),
            granted: GrantedCredentials {
                username: username.to_string(),
                token: token.to_string(),
            },
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OAuthExchange for FakeOAuth {
    async fn authenticate(&self, code: &str) -> AppResult<GrantedCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code == self.valid_code {
            Ok(self.granted.clone())
        } else {
            Err(ApiError::OAuthFailed {
                description: "bad_verification_code".to_string(),
            }
            .into())
        }
    }
}
