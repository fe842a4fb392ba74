/// GitHub OAuth 授权
///
/// 用授权码换取访问令牌，再查询令牌所属的用户名
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::clients::github_client::CLIENT_USER_AGENT;
use crate::config::Config;
use crate::error::{ApiError, AppResult};

/// 授权成功后得到的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedCredentials {
    pub username: String,
    pub token: String,
}

/// 授权能力
#[async_trait]
pub trait OAuthExchange: Send + Sync {
    async fn authenticate(&self, code: &str) -> AppResult<GrantedCredentials>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    login: String,
}

pub struct GithubAuth {
    http: reqwest::Client,
    access_token_url: String,
    user_info_url: String,
    client_id: String,
    client_secret: String,
}

impl GithubAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token_url: config.github_access_token_url.clone(),
            user_info_url: config.github_user_info_url.clone(),
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
        }
    }

    /// 授权码换令牌
    pub async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let response = self
            .http
            .post(&self.access_token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await?;

        let body: TokenResponse = response.json().await?;
        match body.access_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => {
                let description = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| "未返回访问令牌".to_string());
                Err(ApiError::OAuthFailed { description }.into())
            }
        }
    }

    /// 查询令牌对应的登录名
    pub async fn fetch_login(&self, token: &str) -> AppResult<String> {
        let response = self
            .http
            .get(&self.user_info_url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::OAuthFailed {
                description: format!("获取用户信息失败 (status={})", response.status().as_u16()),
            }
            .into());
        }

        let user: UserInfo = response.json().await?;
        Ok(user.login)
    }
}

#[async_trait]
impl OAuthExchange for GithubAuth {
    async fn authenticate(&self, code: &str) -> AppResult<GrantedCredentials> {
        debug!("使用授权码换取令牌");
        let token = self.exchange_code(code).await?;
        let username = self.fetch_login(&token).await?;
        info!("✓ GitHub 授权成功: {}", username);
        Ok(GrantedCredentials { username, token })
    }
}
