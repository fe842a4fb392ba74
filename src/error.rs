use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 本地存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 页面数据提取错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed { port: u16, source: BoxedSource },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed { source: BoxedSource },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed { source: BoxedSource },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed { endpoint: String, source: BoxedSource },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// OAuth 授权失败
    #[error("授权失败: {description}")]
    OAuthFailed { description: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed { source: BoxedSource },
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed { path: String, source: BoxedSource },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed { path: String, source: BoxedSource },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed { path: String, source: BoxedSource },
    /// TOML 序列化失败
    #[error("TOML序列化失败: {source}")]
    TomlSerializeFailed { source: BoxedSource },
    /// 锁被污染
    #[error("状态锁已损坏")]
    Poisoned,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少凭据或仓库信息
    #[error("缺少配置项: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

/// 页面数据提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 记录不完整，禁止提交
    #[error("题目记录不完整，缺少: {}", .missing.join(", "))]
    IncompleteRecord { missing: Vec<&'static str> },
    /// 代码或语言缺失
    #[error("未能提取代码或语言")]
    CodeOrLanguageMissing,
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Storage(StorageError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Storage(StorageError::TomlSerializeFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(port: u16, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AppError::Browser(BrowserError::LaunchFailed { source: source.into() })
    }

    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 页面脚本执行失败
    pub fn script_failed(err: anyhow::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed { source: err.into() })
    }

    /// 创建错误响应
    pub fn bad_response(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Storage(StorageError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否属于“配置不完整”
    pub fn is_config_incomplete(&self) -> bool {
        matches!(self, AppError::Config(ConfigError::Incomplete { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
