//! 页面内的 LeetCode GraphQL 调用
//!
//! 请求在被跟踪页面里用 `fetch` 发出，带上用户自己的会话 cookie。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::JsExecutor;

const USER_STATUS_QUERY: &str = "query globalData { userStatus { username isSignedIn } }";

const RECENT_AC_QUERY: &str = "query recentAcSubmissions($username: String!, $limit: Int!) { \
     recentAcSubmissionList(username: $username, limit: $limit) { id title titleSlug timestamp } }";

const SUBMISSION_DETAILS_QUERY: &str = "query submissionDetails($submissionId: Int!) { \
     submissionDetails(submissionId: $submissionId) { code lang { name verboseName } \
     question { questionFrontendId title titleSlug difficulty content } } }";

/// 最近一次通过的提交
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedSubmission {
    pub id: String,
    pub title: String,
    pub title_slug: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLang {
    pub name: String,
    #[serde(default)]
    pub verbose_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionQuestion {
    pub question_frontend_id: String,
    pub title: String,
    pub title_slug: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// 一次提交的完整内容
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionDetail {
    pub code: String,
    pub lang: SubmissionLang,
    pub question: SubmissionQuestion,
}

/// 已通过题目的来源
#[async_trait]
pub trait SolvedSource: Send + Sync {
    /// 当前登录的用户名，未登录时为 None
    async fn signed_in_user(&self) -> AppResult<Option<String>>;

    async fn recent_accepted(&self, username: &str, limit: u32) -> AppResult<Vec<AcceptedSubmission>>;

    async fn submission_detail(&self, submission_id: &str) -> AppResult<SubmissionDetail>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatus {
    username: Option<String>,
    is_signed_in: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatusData {
    user_status: UserStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcData {
    recent_ac_submission_list: Option<Vec<AcceptedSubmission>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionDetailsData {
    submission_details: Option<SubmissionDetail>,
}

/// 构建 GraphQL 请求脚本
fn build_graphql_script(endpoint: &str, query: &str, variables: &Value) -> AppResult<String> {
    let payload = serde_json::to_string(&json!({ "query": query, "variables": variables }))?;
    let endpoint = serde_json::to_string(endpoint)?;

    Ok(format!(
        r#"
        (async () => {{
            try {{
                const csrf = (document.cookie.match(/csrftoken=([^;]+)/) || [])[1] || "";
                const res = await fetch({endpoint}, {{
                    method: "POST",
                    headers: {{
                        "Content-Type": "application/json",
                        "Accept": "application/json",
                        "x-csrftoken": csrf
                    }},
                    credentials: "include",
                    body: JSON.stringify({payload})
                }});
                const body = await res.json();
                return {{ v: body, status: res.status }};
            }} catch (err) {{
                return {{ v: null, error: String(err) }};
            }}
        }})()
        "#,
    ))
}

/// 从脚本返回的信封里取出 `data`
fn decode_envelope<T: DeserializeOwned>(endpoint: &str, envelope: Value) -> AppResult<T> {
    if let Some(error) = envelope.get("error").and_then(Value::as_str) {
        return Err(AppError::bad_response(endpoint, 0, error));
    }

    let body = envelope.get("v").cloned().unwrap_or(Value::Null);
    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
        let status = envelope.get("status").and_then(Value::as_u64).unwrap_or(200) as u16;
        return Err(AppError::bad_response(endpoint, status, errors.to_string()));
    }

    match body.get("data") {
        Some(data) if !data.is_null() => Ok(serde_json::from_value(data.clone())?),
        _ => {
            let status = envelope.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;
            Err(AppError::bad_response(endpoint, status, "GraphQL 响应缺少 data"))
        }
    }
}

/// 借用被跟踪页面登录态的 LeetCode 客户端
pub struct LeetcodeSession {
    executor: JsExecutor,
    endpoint: String,
}

impl LeetcodeSession {
    pub fn new(executor: JsExecutor, base_url: &str) -> Self {
        Self {
            executor,
            endpoint: format!("{}/graphql/", base_url.trim_end_matches('/')),
        }
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> AppResult<T> {
        let script = build_graphql_script(&self.endpoint, query, &variables)?;
        let envelope = self.executor.eval(script).await.map_err(AppError::script_failed)?;
        decode_envelope(&self.endpoint, envelope)
    }
}

#[async_trait]
impl SolvedSource for LeetcodeSession {
    async fn signed_in_user(&self) -> AppResult<Option<String>> {
        let data: UserStatusData = self.graphql(USER_STATUS_QUERY, json!({})).await?;
        let status = data.user_status;
        Ok(status.username.filter(|name| status.is_signed_in && !name.is_empty()))
    }

    async fn recent_accepted(&self, username: &str, limit: u32) -> AppResult<Vec<AcceptedSubmission>> {
        let data: RecentAcData = self
            .graphql(RECENT_AC_QUERY, json!({ "username": username, "limit": limit }))
            .await?;
        let list = data.recent_ac_submission_list.unwrap_or_default();
        debug!("{} 最近通过 {} 次", username, list.len());
        Ok(list)
    }

    async fn submission_detail(&self, submission_id: &str) -> AppResult<SubmissionDetail> {
        let id: i64 = submission_id
            .parse()
            .map_err(|_| AppError::Other(format!("无效的提交编号: {}", submission_id)))?;
        let data: SubmissionDetailsData = self
            .graphql(SUBMISSION_DETAILS_QUERY, json!({ "submissionId": id }))
            .await?;
        data.submission_details
            .ok_or_else(|| AppError::bad_response(&self.endpoint, 200, format!("提交 {} 不存在", submission_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_includes_session_cookies() {
        let script = build_graphql_script(
            "https://leetcode.com/graphql/",
            RECENT_AC_QUERY,
            &json!({ "username": "alice", "limit": 20 }),
        )
        .unwrap();
        assert!(script.contains(r#"credentials: "include""#));
        assert!(script.contains(r#"fetch("https://leetcode.com/graphql/""#));
        assert!(script.contains(r#""username":"alice""#));
    }

    #[test]
    fn test_decode_recent_list() {
        let envelope = json!({
            "status": 200,
            "v": {"data": {"recentAcSubmissionList": [
                {"id": "101", "title": "Two Sum", "titleSlug": "two-sum", "timestamp": "1700000000"}
            ]}}
        });
        let data: RecentAcData = decode_envelope("gql", envelope).unwrap();
        let list = data.recent_ac_submission_list.unwrap();
        assert_eq!(list[0].title_slug, "two-sum");
    }

    #[test]
    fn test_decode_detail() {
        let envelope = json!({
            "v": {"data": {"submissionDetails": {
                "code": "print(1)",
                "lang": {"name": "python3", "verboseName": "Python3"},
                "question": {"questionFrontendId": "1", "title": "Two Sum", "titleSlug": "two-sum",
                             "difficulty": "Easy", "content": "<p>Given</p>"}
            }}}
        });
        let data: SubmissionDetailsData = decode_envelope("gql", envelope).unwrap();
        let detail = data.submission_details.unwrap();
        assert_eq!(detail.lang.name, "python3");
        assert_eq!(detail.question.question_frontend_id, "1");
    }

    #[test]
    fn test_decode_errors() {
        let fetch_failed = json!({"v": null, "error": "TypeError: Failed to fetch"});
        let err = decode_envelope::<RecentAcData>("gql", fetch_failed).unwrap_err();
        assert!(err.to_string().contains("Failed to fetch"));

        let graphql_error = json!({"status": 200, "v": {"errors": [{"message": "User matching query does not exist."}], "data": null}});
        let err = decode_envelope::<RecentAcData>("gql", graphql_error).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let empty = json!({"status": 403, "v": {}});
        let err = decode_envelope::<RecentAcData>("gql", empty).unwrap_err();
        assert!(err.to_string().contains("status=403"));
    }
}
