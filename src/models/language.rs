//! 语言解析
//!
//! 把页面上的语言标签（`C++`、`Python3`）或本地缓存里的语言键（`cpp`、`python3`）
//! 映射为规范名称和文件扩展名。

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 语言信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    /// 页面上显示的原始标签
    pub display_label: String,
    /// 规范名称，同时用于 `code.language-<name>` 选择器；为空表示无法识别
    pub canonical_name: String,
    /// 文件扩展名（带点）
    pub file_extension: String,
}

impl LanguageInfo {
    /// 无法识别时返回的哨兵值
    pub fn unrecognized(display_label: impl Into<String>) -> Self {
        Self {
            display_label: display_label.into(),
            canonical_name: String::new(),
            file_extension: String::new(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !self.canonical_name.is_empty()
    }
}

/// 小写标签 -> (规范名称, 扩展名)
static LANGUAGES: phf::Map<&'static str, (&'static str, &'static str)> = phf_map! {
    "c++" => ("cpp", ".cpp"),
    "cpp" => ("cpp", ".cpp"),
    "java" => ("java", ".java"),
    "python" => ("python", ".py"),
    "python3" => ("python", ".py"),
    "pandas" => ("python", ".py"),
    "c" => ("c", ".c"),
    "c#" => ("csharp", ".cs"),
    "csharp" => ("csharp", ".cs"),
    "javascript" => ("javascript", ".js"),
    "typescript" => ("typescript", ".ts"),
    "php" => ("php", ".php"),
    "swift" => ("swift", ".swift"),
    "kotlin" => ("kotlin", ".kt"),
    "dart" => ("dart", ".dart"),
    "go" => ("go", ".go"),
    "golang" => ("go", ".go"),
    "ruby" => ("ruby", ".rb"),
    "scala" => ("scala", ".scala"),
    "rust" => ("rust", ".rs"),
    "racket" => ("racket", ".rkt"),
    "erlang" => ("erlang", ".erl"),
    "elixir" => ("elixir", ".ex"),
    "mysql" => ("sql", ".sql"),
    "ms sql server" => ("sql", ".sql"),
    "mssql" => ("sql", ".sql"),
    "oracle" => ("sql", ".sql"),
    "oraclesql" => ("sql", ".sql"),
    "postgresql" => ("sql", ".sql"),
    "bash" => ("bash", ".sh"),
};

/// 解析语言标签，永不失败
///
/// 支持带引号的 JSON 字符串（`"\"cpp\""`），这是页面本地缓存中的存储格式。
pub fn resolve(raw_label: Option<&str>) -> LanguageInfo {
    let Some(raw) = raw_label else {
        return LanguageInfo::unrecognized("");
    };

    let label = raw.trim().trim_matches('"').trim();
    match LANGUAGES.get(label.to_lowercase().as_str()) {
        Some((canonical, extension)) => LanguageInfo {
            display_label: label.to_string(),
            canonical_name: canonical.to_string(),
            file_extension: extension.to_string(),
        },
        None => LanguageInfo::unrecognized(label),
    }
}
