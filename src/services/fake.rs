//! 测试用的提示与同步任务替身

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::services::{Notifier, SyncJob, SyncOutcome, ToastKind};

/// 记下所有提示的 Notifier
#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<(String, ToastKind)>>,
    comment: Mutex<String>,
    prompts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn answering(comment: &str) -> Self {
        let notifier = Self::default();
        *notifier.comment.lock().unwrap() = comment.to_string();
        notifier
    }

    pub fn toasts(&self) -> Vec<(String, ToastKind)> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_toast(&self, message: &str, kind: ToastKind) {
        self.toasts.lock().unwrap().push((message.to_string(), kind));
    }

    async fn prompt_comment(&self) -> String {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.comment.lock().unwrap().clone()
    }
}

/// 结果固定、可选延迟的同步任务
pub struct ScriptedJob {
    result: Result<SyncOutcome, String>,
    delay: Duration,
    runs: AtomicUsize,
}

impl ScriptedJob {
    pub fn succeeding(message: &str) -> Self {
        Self {
            result: Ok(SyncOutcome {
                success: true,
                message: message.to_string(),
            }),
            delay: Duration::ZERO,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            result: Err(error.to_string()),
            delay: Duration::ZERO,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncJob for ScriptedJob {
    async fn run(&self) -> AppResult<SyncOutcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone().map_err(AppError::Other)
    }
}
