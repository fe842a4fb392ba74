//! 页面提示服务 - 业务能力层
//!
//! 在被跟踪页面右下角弹出提示，或向用户询问提交说明。

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::infrastructure::JsExecutor;

/// 提示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    fn background(self) -> &'static str {
        match self {
            ToastKind::Success => "#52c41a",
            ToastKind::Error => "#ff4d4f",
        }
    }
}

/// 用户提示能力
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 显示一条提示，失败只记日志
    async fn show_toast(&self, message: &str, kind: ToastKind);

    /// 询问本次提交的说明，取消或失败时返回空字符串
    async fn prompt_comment(&self) -> String;
}

fn build_toast_script(message: &str, kind: ToastKind) -> String {
    let message = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"
        (() => {{
            const toast = document.createElement("div");
            toast.style.cssText = "position:fixed;bottom:20px;right:20px;z-index:10000;" +
                "background:{background};color:white;padding:12px 24px;border-radius:8px;" +
                "font-family:-apple-system,sans-serif;font-weight:500;" +
                "box-shadow:0 4px 12px rgba(0,0,0,0.15);animation:leetcodeTrackerFadeIn 0.3s ease;";
            toast.textContent = {message};
            if (!document.getElementById("leetcode-tracker-toast-style")) {{
                const style = document.createElement("style");
                style.id = "leetcode-tracker-toast-style";
                style.textContent = "@keyframes leetcodeTrackerFadeIn {{ from {{ opacity: 0; transform: translateY(10px); }} to {{ opacity: 1; transform: translateY(0); }} }}";
                document.head.appendChild(style);
            }}
            document.body.appendChild(toast);
            setTimeout(() => {{
                toast.style.opacity = "0";
                toast.style.transition = "opacity 0.5s";
                setTimeout(() => toast.remove(), 500);
            }}, 4000);
            return {{ v: true }};
        }})()
        "#,
        background = kind.background(),
        message = message
    )
}

const PROMPT_SCRIPT: &str = r#"
    (() => {
        const answer = window.prompt("为本次提交添加说明（可留空）:", "");
        return { v: answer };
    })()
"#;

#[derive(Deserialize)]
struct PromptAnswer {
    v: Option<String>,
}

/// 通过页面脚本实现的提示
pub struct PageNotifier {
    executor: JsExecutor,
}

impl PageNotifier {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Notifier for PageNotifier {
    async fn show_toast(&self, message: &str, kind: ToastKind) {
        if let Err(e) = self.executor.eval(build_toast_script(message, kind)).await {
            warn!("显示提示失败: {}", e);
        }
    }

    async fn prompt_comment(&self) -> String {
        match self.executor.eval_as::<PromptAnswer>(PROMPT_SCRIPT).await {
            Ok(answer) => answer.v.unwrap_or_default().trim().to_string(),
            Err(e) => {
                warn!("询问提交说明失败: {}", e);
                String::new()
            }
        }
    }
}
