use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::language::LanguageInfo;

/// 题目难度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Unknown,
}

impl Difficulty {
    /// 大小写不敏感地解析，不去除空白；无法识别时返回 `Unknown`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unknown,
        }
    }

    /// LeetCode 题库接口里的 level 字段
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            _ => Difficulty::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Difficulty::Unknown
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前题目页对应的规范地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemUrl {
    /// `/problems/<name>/`，用于匹配题目标题链接
    pub path: String,
    /// 题目描述页完整地址
    pub description_url: String,
}

/// 从隐藏文档中抓取的题目元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemMetadata {
    pub slug: String,
    pub difficulty: Difficulty,
    pub description: String,
}

impl ProblemMetadata {
    pub fn is_complete(&self) -> bool {
        !self.slug.is_empty() && self.difficulty.is_known() && !self.description.is_empty()
    }
}

/// 一次 Accepted 提交对应的完整记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub slug: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub canonical_url: String,
    pub source_code: String,
    pub language: LanguageInfo,
}

impl ProblemRecord {
    /// 以导航得到的地址创建空记录
    pub fn for_url(url: &ProblemUrl) -> Self {
        Self {
            canonical_url: url.path.clone(),
            ..Self::default()
        }
    }

    /// 合并元数据（只覆盖已抓到的字段）
    pub fn apply_metadata(&mut self, metadata: &ProblemMetadata) {
        if !metadata.slug.is_empty() {
            self.slug = metadata.slug.clone();
        }
        if metadata.difficulty.is_known() {
            self.difficulty = metadata.difficulty;
        }
        if !metadata.description.is_empty() {
            self.description = metadata.description.clone();
        }
    }

    /// 缺失的字段名，空表示记录完整
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.slug.is_empty() {
            missing.push("slug");
        }
        if !self.difficulty.is_known() {
            missing.push("difficulty");
        }
        if self.description.is_empty() {
            missing.push("description");
        }
        if self.source_code.is_empty() {
            missing.push("sourceCode");
        }
        if !self.language.is_recognized() {
            missing.push("language");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// 仓库中已存在的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProblem {
    pub original_name: String,
    pub problem_id: String,
}

/// 题库难度目录中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub problem_id: String,
    pub title_slug: String,
    pub difficulty: Difficulty,
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static EDGE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[/\-_]+|[/\-_]+$").expect("valid regex"));

/// 把题目标题规范化为可作为文件名的 slug
///
/// 顺序：句点转连字符、去掉空白 → 去掉首尾分隔符 → 内部斜杠转连字符。
pub fn format_problem_name(problem_name: &str) -> String {
    let formatted = problem_name.trim().replace('.', "-");
    let formatted = WHITESPACE.replace_all(&formatted, "");
    let formatted = EDGE_SEPARATORS.replace_all(&formatted, "");
    formatted.replace('/', "-")
}
