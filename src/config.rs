use std::time::Duration;

use serde::Serialize;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 是否自行启动无头浏览器（否则连接已打开的浏览器）
    pub headless: bool,
    /// 无头模式下的浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 目标URL
    pub target_url: String,
    /// 本地状态文件（凭据、开关、同步状态）
    pub state_file: String,
    /// 提取/同步失败记录文件
    pub failure_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- GitHub 配置 ---
    pub github_api_base_url: String,
    pub github_access_token_url: String,
    pub github_user_info_url: String,
    pub github_client_id: String,
    pub github_client_secret: String,
    // --- LeetCode 配置 ---
    pub leetcode_base_url: String,
    // --- 观察器参数 ---
    /// DOM 变更轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 两次 Accepted 处理之间的冷却时间（秒）
    pub cooldown_secs: u64,
    /// 隐藏文档加载超时（毫秒），不计入元数据观察窗口
    pub frame_load_timeout_ms: u64,
    /// 题目元数据抓取超时（毫秒）
    pub metadata_timeout_ms: u64,
    /// 代码提取重试前的等待（毫秒）
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            headless: false,
            chrome_executable: None,
            target_url: "https://leetcode.com/problemset/".to_string(),
            state_file: "leetcode_tracker.toml".to_string(),
            failure_log_file: "failures.txt".to_string(),
            verbose_logging: false,
            github_api_base_url: "https://api.github.com".to_string(),
            github_access_token_url: "https://github.com/login/oauth/access_token".to_string(),
            github_user_info_url: "https://api.github.com/user".to_string(),
            github_client_id: String::new(),
            github_client_secret: String::new(),
            leetcode_base_url: "https://leetcode.com".to_string(),
            poll_interval_ms: 250,
            cooldown_secs: 10,
            frame_load_timeout_ms: 10_000,
            metadata_timeout_ms: 3000,
            retry_delay_ms: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            state_file: std::env::var("STATE_FILE").unwrap_or(default.state_file),
            failure_log_file: std::env::var("FAILURE_LOG_FILE").unwrap_or(default.failure_log_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            github_api_base_url: std::env::var("GITHUB_API_BASE_URL").unwrap_or(default.github_api_base_url),
            github_access_token_url: std::env::var("GITHUB_ACCESS_TOKEN_URL").unwrap_or(default.github_access_token_url),
            github_user_info_url: std::env::var("GITHUB_USER_INFO_URL").unwrap_or(default.github_user_info_url),
            github_client_id: std::env::var("GITHUB_CLIENT_ID").unwrap_or(default.github_client_id),
            github_client_secret: std::env::var("GITHUB_CLIENT_SECRET").unwrap_or(default.github_client_secret),
            leetcode_base_url: std::env::var("LEETCODE_BASE_URL").unwrap_or(default.leetcode_base_url),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            cooldown_secs: std::env::var("COOLDOWN_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cooldown_secs),
            frame_load_timeout_ms: std::env::var("FRAME_LOAD_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.frame_load_timeout_ms),
            metadata_timeout_ms: std::env::var("METADATA_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.metadata_timeout_ms),
            retry_delay_ms: std::env::var("RETRY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn frame_load_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_load_timeout_ms)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 可以公开给界面的配置（不含 client secret）
    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            repository_url: format!("{}/repos/", self.github_api_base_url),
            access_token_url: self.github_access_token_url.clone(),
            user_info_url: self.github_user_info_url.clone(),
            client_id: self.github_client_id.clone(),
            leetcode_url: self.leetcode_base_url.clone(),
        }
    }
}

/// `getDataConfig` 的返回内容
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    pub repository_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    pub client_id: String,
    pub leetcode_url: String,
}
