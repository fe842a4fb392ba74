//! DOM 探针 - 基础设施层
//!
//! 把"查询页面"的能力抽象成 [`PageProbe`]，上层（提取器、观察器）只依赖这个 trait。
//! [`DomProbe`] 是基于 [`JsExecutor`] 的实现，可以指向主文档，也可以指向隐藏 iframe 中的文档。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::infrastructure::JsExecutor;

/// 对一个文档的只读查询能力
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// 文档当前地址
    async fn location(&self) -> Result<Option<String>>;

    /// 第一个匹配元素的文本
    async fn text_of(&self, selector: &str) -> Result<Option<String>>;

    /// 最后一个匹配元素的文本
    async fn last_text_of(&self, selector: &str) -> Result<Option<String>>;

    /// localStorage 中的原始值
    async fn local_storage_item(&self, key: &str) -> Result<Option<String>>;

    /// DOM 变更序号；首次调用时安装观察器。文档尚未就绪时返回 None
    async fn mutation_seq(&self) -> Result<Option<u64>>;
}

/// 隐藏的辅助文档，用完必须摘除
#[async_trait]
pub trait HiddenDocument: PageProbe {
    /// 文档已加载完成，且已导航到 `url`（前缀匹配）
    async fn is_loaded(&self, url: &str) -> Result<bool>;

    /// 从页面上摘除
    async fn detach(&self) -> Result<()>;
}

/// 能够创建隐藏辅助文档的宿主
#[async_trait]
pub trait DocumentHost: Send + Sync {
    async fn open_hidden(&self, url: &str) -> Result<Arc<dyn HiddenDocument>>;
}

/// 辅助文档的作用域守卫
///
/// 正常路径调用 [`HiddenDocumentGuard::release`]；如果守卫在未释放时被丢弃
/// （任务被取消、提前返回），Drop 会在后台补做摘除。
pub struct HiddenDocumentGuard {
    doc: Arc<dyn HiddenDocument>,
    released: bool,
}

impl HiddenDocumentGuard {
    pub fn new(doc: Arc<dyn HiddenDocument>) -> Self {
        Self { doc, released: false }
    }

    pub fn document(&self) -> &dyn HiddenDocument {
        self.doc.as_ref()
    }

    /// 摘除文档
    pub async fn release(mut self) {
        if let Err(e) = self.doc.detach().await {
            warn!("摘除隐藏文档失败: {}", e);
        }
        self.released = true;
    }
}

impl Drop for HiddenDocumentGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let doc = Arc::clone(&self.doc);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = doc.detach().await {
                        warn!("后台摘除隐藏文档失败: {}", e);
                    }
                });
            }
            Err(_) => warn!("没有运行时，无法摘除隐藏文档"),
        }
    }
}

/// 脚本统一返回 `{ v: ... }`，避免 null 结果丢失
#[derive(Debug, Deserialize)]
struct Slot<T> {
    v: Option<T>,
}

fn js_string(s: &str) -> String {
    // serde_json 的字符串输出同时是合法的 JS 字符串字面量
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// 基于 JsExecutor 的探针
#[derive(Clone)]
pub struct DomProbe {
    executor: JsExecutor,
    /// 求值后得到 Document（或 null）的 JS 表达式
    root: String,
}

impl DomProbe {
    /// 指向被跟踪页面的主文档
    pub fn main(executor: JsExecutor) -> Self {
        Self {
            executor,
            root: "document".to_string(),
        }
    }

    /// 指向某个 iframe 内的文档
    pub fn frame(executor: JsExecutor, frame_id: &str) -> Self {
        Self {
            executor,
            root: format!("(document.getElementById({}) || {{}}).contentDocument", js_string(frame_id)),
        }
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, body: &str) -> Result<Option<T>> {
        let script = format!(
            r#"
            (() => {{
                try {{
                    const doc = {root};
                    if (!doc) return {{ v: null }};
                    {body}
                }} catch (err) {{
                    return {{ v: null }};
                }}
            }})()
            "#,
            root = self.root,
            body = body
        );
        let slot: Slot<T> = self.executor.eval_as(script).await?;
        Ok(slot.v)
    }
}

#[async_trait]
impl PageProbe for DomProbe {
    async fn location(&self) -> Result<Option<String>> {
        self.query("return { v: doc.location ? doc.location.href : null };").await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let body = format!(
            "const el = doc.querySelector({}); return {{ v: el ? el.textContent : null }};",
            js_string(selector)
        );
        self.query(&body).await
    }

    async fn last_text_of(&self, selector: &str) -> Result<Option<String>> {
        let body = format!(
            r#"const els = doc.querySelectorAll({});
               return {{ v: els.length > 0 ? els[els.length - 1].textContent : null }};"#,
            js_string(selector)
        );
        self.query(&body).await
    }

    async fn local_storage_item(&self, key: &str) -> Result<Option<String>> {
        let body = format!(
            "const w = doc.defaultView; return {{ v: w ? w.localStorage.getItem({}) : null }};",
            js_string(key)
        );
        self.query(&body).await
    }

    async fn mutation_seq(&self) -> Result<Option<u64>> {
        self.query(
            r#"const w = doc.defaultView;
               if (!w || !doc.body) return { v: null };
               if (!w.__leetcodeTracker) {
                   w.__leetcodeTracker = { seq: 0 };
                   new w.MutationObserver(() => { w.__leetcodeTracker.seq += 1; })
                       .observe(doc.body, { childList: true, subtree: true, characterData: true });
               }
               return { v: w.__leetcodeTracker.seq };"#,
        )
        .await
    }
}

/// 页面内隐藏 iframe
pub struct HiddenFrame {
    executor: JsExecutor,
    frame_id: String,
    probe: DomProbe,
}

#[async_trait]
impl PageProbe for HiddenFrame {
    async fn location(&self) -> Result<Option<String>> {
        self.probe.location().await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        self.probe.text_of(selector).await
    }

    async fn last_text_of(&self, selector: &str) -> Result<Option<String>> {
        self.probe.last_text_of(selector).await
    }

    async fn local_storage_item(&self, key: &str) -> Result<Option<String>> {
        self.probe.local_storage_item(key).await
    }

    async fn mutation_seq(&self) -> Result<Option<u64>> {
        self.probe.mutation_seq().await
    }
}

#[async_trait]
impl HiddenDocument for HiddenFrame {
    async fn is_loaded(&self, url: &str) -> Result<bool> {
        // 新建的 iframe 先是 about:blank，它的 readyState 也是 complete
        let body = format!(
            r#"return {{ v: doc.readyState === "complete" && !!doc.location && doc.location.href.startsWith({}) }};"#,
            js_string(url)
        );
        Ok(self.probe.query::<bool>(&body).await?.unwrap_or(false))
    }

    async fn detach(&self) -> Result<()> {
        let script = format!(
            r#"
            (() => {{
                const frame = document.getElementById({});
                if (frame) frame.remove();
                return {{ v: frame !== null }};
            }})()
            "#,
            js_string(&self.frame_id)
        );
        let removed: Slot<bool> = self.executor.eval_as(script).await?;
        debug!("隐藏文档 {} 已摘除: {:?}", self.frame_id, removed.v);
        Ok(())
    }
}

/// 在被跟踪页面中创建隐藏 iframe 的宿主
pub struct FrameHost {
    executor: JsExecutor,
    next_id: AtomicU64,
}

impl FrameHost {
    pub fn new(executor: JsExecutor) -> Self {
        Self {
            executor,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl DocumentHost for FrameHost {
    async fn open_hidden(&self, url: &str) -> Result<Arc<dyn HiddenDocument>> {
        let frame_id = format!("leetcode-tracker-frame-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let script = format!(
            r#"
            (() => {{
                const frame = document.createElement("iframe");
                frame.id = {id};
                frame.style.cssText = "position:absolute;width:0;height:0;border:none;opacity:0;pointer-events:none;";
                frame.src = {url};
                document.body.appendChild(frame);
                return {{ v: true }};
            }})()
            "#,
            id = js_string(&frame_id),
            url = js_string(url)
        );
        let _: Slot<bool> = self.executor.eval_as(script).await?;
        debug!("已创建隐藏文档 {} -> {}", frame_id, url);

        Ok(Arc::new(HiddenFrame {
            probe: DomProbe::frame(self.executor.clone(), &frame_id),
            executor: self.executor.clone(),
            frame_id,
        }))
    }
}
