/// LeetCode 公开题库客户端
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::debug;

use crate::clients::github_client::CLIENT_USER_AGENT;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{CatalogueEntry, Difficulty};

/// 全量题目难度目录
#[async_trait]
pub trait ProblemCatalogue: Send + Sync {
    async fn fetch_catalogue(&self) -> AppResult<Vec<CatalogueEntry>>;
}

#[derive(Debug, Deserialize)]
struct AllProblems {
    stat_status_pairs: Vec<StatStatusPair>,
}

#[derive(Debug, Deserialize)]
struct StatStatusPair {
    stat: Stat,
    difficulty: Level,
}

#[derive(Debug, Deserialize)]
struct Stat {
    frontend_question_id: serde_json::Value,
    #[serde(rename = "question__title_slug", default)]
    title_slug: String,
}

#[derive(Debug, Deserialize)]
struct Level {
    level: u8,
}

impl From<StatStatusPair> for CatalogueEntry {
    fn from(pair: StatStatusPair) -> Self {
        // 接口里的题号有时是数字、有时是字符串
        let problem_id = match pair.stat.frontend_question_id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        CatalogueEntry {
            problem_id,
            title_slug: pair.stat.title_slug,
            difficulty: Difficulty::from_level(pair.difficulty.level),
        }
    }
}

pub struct LeetcodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl LeetcodeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.leetcode_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProblemCatalogue for LeetcodeClient {
    async fn fetch_catalogue(&self) -> AppResult<Vec<CatalogueEntry>> {
        let url = format!("{}/api/problems/all/", self.base_url);
        let response = self.http.get(&url).header(USER_AGENT, CLIENT_USER_AGENT).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AppError::bad_response(url, status, "获取题库失败"));
        }

        let all: AllProblems = response.json().await?;
        debug!("题库共 {} 道题", all.stat_status_pairs.len());
        Ok(all.stat_status_pairs.into_iter().map(CatalogueEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> LeetcodeClient {
        LeetcodeClient::new(&Config {
            leetcode_base_url: format!("{}/", server.uri()),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_fetch_catalogue_maps_levels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/problems/all/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stat_status_pairs": [
                    {"stat": {"frontend_question_id": 1, "question__title_slug": "two-sum"}, "difficulty": {"level": 1}},
                    {"stat": {"frontend_question_id": "42", "question__title_slug": "trapping-rain-water"}, "difficulty": {"level": 3}},
                    {"stat": {"frontend_question_id": 7}, "difficulty": {"level": 9}}
                ]
            })))
            .mount(&server)
            .await;

        let catalogue = client(&server).fetch_catalogue().await.unwrap();
        assert_eq!(catalogue.len(), 3);
        assert_eq!(catalogue[0].problem_id, "1");
        assert_eq!(catalogue[0].difficulty, Difficulty::Easy);
        assert_eq!(catalogue[1].problem_id, "42");
        assert_eq!(catalogue[1].difficulty, Difficulty::Hard);
        assert_eq!(catalogue[2].difficulty, Difficulty::Unknown);
    }

    #[tokio::test]
    async fn test_fetch_catalogue_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).fetch_catalogue().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
