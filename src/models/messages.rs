//! 界面 / 页面端与协调器之间的消息类型

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 入站请求，`type` 字段区分变体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    UpdateDifficultyStats {
        #[serde(default)]
        difficulty: Option<String>,
    },
    GetDataConfig,
    GetStorageConfig {
        #[serde(default)]
        properties: Vec<String>,
    },
    SaveUserCredentials {
        username: String,
        token: String,
    },
    SaveRepository {
        repository: String,
    },
    SyncSolvedProblems,
    RequestInitialStats,
    Authenticate {
        code: String,
    },
    /// 类型已知但字段不合法，保留解析错误
    #[serde(skip)]
    Malformed { error: String },
    /// 无法识别的请求类型
    #[serde(other)]
    Unknown,
}

impl Request {
    /// 解析一行 JSON
    ///
    /// 不是 JSON 或没有 `type` 字段时视作未知请求；有 `type` 但字段不合法时返回解析错误。
    pub fn parse_line(line: &str) -> Self {
        let Ok(value) = serde_json::from_str::<JsonValue>(line) else {
            return Request::Unknown;
        };
        let tagged = value.get("type").is_some_and(JsonValue::is_string);

        match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) if tagged => Request::Malformed { error: e.to_string() },
            Err(_) => Request::Unknown,
        }
    }
}

/// 每个请求都会得到的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    pub fn with_data(data: JsonValue) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }

    /// 只有成败、没有附加说明
    pub fn from_flag(success: bool) -> Self {
        Self {
            success,
            error: None,
            data: None,
        }
    }
}
