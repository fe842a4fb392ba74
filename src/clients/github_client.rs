/// GitHub 仓库客户端
///
/// 封装提交题解文件和列出已跟踪题目的调用逻辑
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ExtractionError};
use crate::models::{ProblemRecord, TrackedProblem};
use crate::storage::{RepoCredentials, StateStore};

pub(crate) const CLIENT_USER_AGENT: &str = "leetcode-tracker";

/// 仓库中题目目录的命名约定：数字前缀 + 连字符 + 大写字母开头的标题
static TRACKED_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-[A-Z]").expect("valid regex"));

/// 远程仓库能力
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// 提交一道题的题解；不完整的记录会被拒绝
    async fn submit(&self, record: &ProblemRecord, comment: &str) -> AppResult<()>;

    /// 列出仓库中已有的题目；任何失败都返回空列表
    async fn list_tracked_problems(&self) -> Vec<TrackedProblem>;
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    sha: String,
}

/// 从目录名取出题号（去掉前导零）
pub fn problem_id_from_name(name: &str) -> String {
    let prefix = name.split('-').next().unwrap_or_default();
    let trimmed = prefix.trim_start_matches('0');
    if trimmed.is_empty() && !prefix.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 题目目录下 README 的内容
fn build_readme(record: &ProblemRecord) -> String {
    format!(
        "# {}\n\n**Difficulty:** {}\n\n**Language:** {}\n\n{}\n",
        record.slug, record.difficulty, record.language.display_label, record.description
    )
}

/// GitHub 客户端
pub struct GithubClient {
    http: reqwest::Client,
    api_base_url: String,
    store: Arc<StateStore>,
}

impl GithubClient {
    /// 创建新的 GitHub 客户端；凭据在每次调用时从状态存储读取
    pub fn new(config: &Config, store: Arc<StateStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: config.github_api_base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    /// contents API 地址；每一段路径单独做百分号编码（slug 里可能有 `?`、`#`）
    fn contents_url(&self, creds: &RepoCredentials, path: &str) -> AppResult<Url> {
        let mut url =
            Url::parse(&self.api_base_url).map_err(|e| AppError::api_request_failed(self.api_base_url.as_str(), e))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Other(format!("无效的 API 地址: {}", self.api_base_url)))?
            .pop_if_empty()
            .extend(["repos", creds.owner.as_str(), creds.repo.as_str(), "contents"])
            .extend(path.split('/'));
        Ok(url)
    }

    fn request(&self, method: Method, url: &Url, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url.clone())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json");
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("token {}", token)),
            None => builder,
        }
    }

    fn credentials(&self) -> AppResult<RepoCredentials> {
        Ok(self.store.snapshot()?.credentials()?)
    }

    /// 已存在文件的 sha，文件不存在时返回 None
    async fn existing_sha(&self, creds: &RepoCredentials, path: &str) -> AppResult<Option<String>> {
        let url = self.contents_url(creds, path)?;
        let response = self.request(Method::GET, &url, Some(&creds.token)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let info: FileInfo = response.json().await?;
                Ok(Some(info.sha))
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(AppError::bad_response(url.as_str(), status.as_u16(), message))
            }
        }
    }

    /// 创建或更新一个文件（一次提交）
    async fn put_file(&self, creds: &RepoCredentials, path: &str, content: &str, message: &str) -> AppResult<()> {
        let sha = self.existing_sha(creds, path).await?;
        let url = self.contents_url(creds, path)?;

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        debug!("提交文件: {}", path);
        let response = self
            .request(Method::PUT, &url, Some(&creds.token))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::bad_response(url.as_str(), status, message));
        }
        Ok(())
    }

    async fn fetch_tracked(&self) -> AppResult<Vec<TrackedProblem>> {
        let creds = self.credentials()?;
        let url = self.contents_url(&creds, "")?;
        let response = self.request(Method::GET, &url, Some(&creds.token)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AppError::bad_response(url.as_str(), status, "无法列出仓库内容"));
        }

        let entries: Vec<ContentEntry> = response.json().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| TRACKED_NAME.is_match(&entry.name))
            .map(|entry| TrackedProblem {
                problem_id: problem_id_from_name(&entry.name),
                original_name: entry.name,
            })
            .collect())
    }
}

#[async_trait]
impl RemoteRepository for GithubClient {
    async fn submit(&self, record: &ProblemRecord, comment: &str) -> AppResult<()> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(ExtractionError::IncompleteRecord { missing }.into());
        }

        let state = self.store.snapshot()?;
        let creds = state.credentials()?;

        let slug = &record.slug;
        let extension = &record.language.file_extension;
        let solution_path = if state.sync_multiple_submission() {
            format!("{}/{}_{}{}", slug, slug, chrono::Utc::now().timestamp(), extension)
        } else {
            format!("{}/{}{}", slug, slug, extension)
        };

        let message = if comment.trim().is_empty() {
            format!("{} - {} ({})", slug, record.difficulty, record.language.display_label)
        } else {
            comment.trim().to_string()
        };

        self.put_file(&creds, &solution_path, &record.source_code, &message).await?;
        self.put_file(&creds, &format!("{}/README.md", slug), &build_readme(record), &message)
            .await?;

        info!("✓ 已提交 {} 到 {}/{}", solution_path, creds.owner, creds.repo);
        Ok(())
    }

    async fn list_tracked_problems(&self) -> Vec<TrackedProblem> {
        match self.fetch_tracked().await {
            Ok(problems) => {
                debug!("仓库中已有 {} 道题", problems.len());
                problems
            }
            Err(e) => {
                warn!("获取仓库题目列表失败: {}", e);
                Vec::new()
            }
        }
    }
}
