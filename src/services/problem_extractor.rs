//! 题目提取服务 - 业务能力层
//!
//! 只负责"从页面读出题目"的能力：当前题目地址、语言与代码、隐藏文档中的元数据。
//! 读不到的字段保持为空，不视为错误。

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::infrastructure::{DocumentHost, HiddenDocument, HiddenDocumentGuard, PageProbe};
use crate::models::{format_problem_name, language, Difficulty, LanguageInfo, ProblemMetadata, ProblemUrl};

/// 页面本地缓存中保存当前语言的键
pub const GLOBAL_LANG_KEY: &str = "global_lang";

/// 语言下拉框，按优先级排列
const LANGUAGE_CONTROLS: [&str; 2] = [
    r#"button[id^="headlessui-popover-button"]"#,
    r#"[data-cy="lang-select-trigger"]"#,
];

/// 三个互斥的难度标记
const DIFFICULTY_MARKERS: [(&str, Difficulty); 3] = [
    ("div.text-difficulty-easy", Difficulty::Easy),
    ("div.text-difficulty-medium", Difficulty::Medium),
    ("div.text-difficulty-hard", Difficulty::Hard),
];

const DESCRIPTION_SELECTOR: &str = r#"div[data-track-load="description_content"]"#;

/// 根据当前地址得到题目规范地址；不是题目页时返回 None
pub fn resolve_problem_url(location: &str) -> Option<ProblemUrl> {
    let url = Url::parse(location).ok()?;
    let host = url.host_str()?;
    if host != "leetcode.com" && !host.ends_with(".leetcode.com") {
        return None;
    }

    let mut segments = url.path_segments()?;
    if segments.next()? != "problems" {
        return None;
    }
    let name = segments.next().filter(|s| !s.is_empty())?;

    Some(ProblemUrl {
        path: format!("/problems/{}/", name),
        description_url: format!("{}/problems/{}/description/", url.origin().ascii_serialization(), name),
    })
}

/// 语言与代码的提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCode {
    pub language: LanguageInfo,
    pub code: String,
}

impl ExtractedCode {
    pub fn is_complete(&self) -> bool {
        self.language.is_recognized() && !self.code.trim().is_empty()
    }
}

/// 题目提取服务
pub struct ProblemExtractor {
    probe: Arc<dyn PageProbe>,
    host: Arc<dyn DocumentHost>,
    load_timeout: Duration,
    metadata_timeout: Duration,
    poll_interval: Duration,
}

impl ProblemExtractor {
    pub fn new(
        probe: Arc<dyn PageProbe>,
        host: Arc<dyn DocumentHost>,
        load_timeout: Duration,
        metadata_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            probe,
            host,
            load_timeout,
            metadata_timeout,
            poll_interval,
        }
    }

    /// 读取当前页面对应的题目地址
    pub async fn resolve_current_problem_url(&self) -> Option<ProblemUrl> {
        match self.probe.location().await {
            Ok(Some(location)) => resolve_problem_url(&location),
            Ok(None) => None,
            Err(e) => {
                warn!("读取页面地址失败: {}", e);
                None
            }
        }
    }

    /// 读取当前选择的语言：先查本地缓存，再查页面控件
    pub async fn extract_language(&self) -> LanguageInfo {
        match self.probe.local_storage_item(GLOBAL_LANG_KEY).await {
            Ok(Some(raw)) => {
                // 缓存值是 JSON 编码的字符串
                let label = serde_json::from_str::<String>(&raw).unwrap_or(raw);
                let info = language::resolve(Some(&label));
                if info.is_recognized() {
                    return info;
                }
                debug!("本地缓存中的语言 {} 无法识别，尝试页面控件", label);
            }
            Ok(None) => {}
            Err(e) => warn!("读取本地缓存语言失败: {}", e),
        }

        for selector in LANGUAGE_CONTROLS {
            match self.probe.text_of(selector).await {
                Ok(Some(text)) if !text.trim().is_empty() => return language::resolve(Some(&text)),
                Ok(_) => {}
                Err(e) => warn!("读取语言控件 {} 失败: {}", selector, e),
            }
        }

        language::resolve(None)
    }

    /// 读取语言和对应代码面板中的代码
    ///
    /// 语言无法识别时直接返回，不去查询代码面板。
    pub async fn extract_language_and_code(&self) -> ExtractedCode {
        let language = self.extract_language().await;
        if !language.is_recognized() {
            warn!("未识别到语言，无法提取代码");
            return ExtractedCode {
                language,
                code: String::new(),
            };
        }

        // 编辑器可能残留多份旧面板，取最后一个
        let selector = format!("code.language-{}", language.canonical_name);
        let code = match self.probe.last_text_of(&selector).await {
            Ok(Some(code)) => code,
            Ok(None) => {
                warn!("未找到语言 {} 的代码面板", language.canonical_name);
                String::new()
            }
            Err(e) => {
                warn!("读取代码面板失败: {}", e);
                String::new()
            }
        };

        ExtractedCode { language, code }
    }

    /// 在隐藏文档中抓取难度、描述和 slug
    ///
    /// 先等待隐藏文档加载完成（单独计时），再观察至多 `metadata_timeout`。
    /// 三项都拿到或超时后立即摘除隐藏文档；缺失的字段保持为空。
    pub async fn extract_metadata(&self, url: &ProblemUrl) -> ProblemMetadata {
        let mut metadata = ProblemMetadata::default();

        let doc = match self.host.open_hidden(&url.description_url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("创建隐藏文档失败: {}", e);
                return metadata;
            }
        };
        let guard = HiddenDocumentGuard::new(doc);

        let loaded = timeout(self.load_timeout, self.wait_loaded(guard.document(), &url.description_url)).await;
        if loaded.is_err() {
            // 加载超时后仍观察一个窗口，页面可能已经渲染
            warn!("⚠️ 隐藏文档加载超时 ({}ms)", self.load_timeout.as_millis());
        }

        let observed = timeout(
            self.metadata_timeout,
            self.observe_metadata(guard.document(), &url.path, &mut metadata),
        )
        .await;

        match observed {
            Ok(()) => info!("✓ 题目元数据已获取: {}", metadata.slug),
            Err(_) => warn!(
                "⚠️ 获取题目元数据超时 ({}ms)，已得到: slug={:?} difficulty={} description={}字符",
                self.metadata_timeout.as_millis(),
                metadata.slug,
                metadata.difficulty,
                metadata.description.chars().count()
            ),
        }

        guard.release().await;
        metadata
    }

    async fn wait_loaded(&self, doc: &dyn HiddenDocument, url: &str) {
        loop {
            match doc.is_loaded(url).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => debug!("隐藏文档暂不可用: {}", e),
            }
            sleep(self.poll_interval).await;
        }
    }

    /// 每当隐藏文档发生变更就补读缺失字段，直到三项齐全
    async fn observe_metadata(&self, doc: &dyn HiddenDocument, problem_path: &str, metadata: &mut ProblemMetadata) {
        let mut last_seq = None;
        loop {
            match doc.mutation_seq().await {
                Ok(Some(seq)) if last_seq != Some(seq) => {
                    last_seq = Some(seq);
                    self.read_metadata(doc, problem_path, metadata).await;
                    if metadata.is_complete() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("隐藏文档暂不可用: {}", e),
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn read_metadata(&self, doc: &dyn HiddenDocument, problem_path: &str, metadata: &mut ProblemMetadata) {
        if !metadata.difficulty.is_known() {
            for (selector, difficulty) in DIFFICULTY_MARKERS {
                if let Ok(Some(_)) = doc.text_of(selector).await {
                    metadata.difficulty = difficulty;
                    break;
                }
            }
        }

        if metadata.description.is_empty() {
            if let Ok(Some(text)) = doc.text_of(DESCRIPTION_SELECTOR).await {
                if !text.trim().is_empty() {
                    metadata.description = text.trim().to_string();
                }
            }
        }

        if metadata.slug.is_empty() {
            let selector = format!("a[href='{}']", problem_path);
            if let Ok(Some(title)) = doc.text_of(&selector).await {
                metadata.slug = format_problem_name(&title);
            }
        }
    }
}
