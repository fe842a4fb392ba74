//! 测试用的内存探针

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::infrastructure::{DocumentHost, HiddenDocument, PageProbe};

/// 以 HashMap 模拟的文档；每次读取 mutation_seq 都视为发生了一次变更
#[derive(Default)]
pub struct FakeProbe {
    location: Mutex<Option<String>>,
    texts: Mutex<HashMap<String, String>>,
    last_texts: Mutex<HashMap<String, String>>,
    storage: Mutex<HashMap<String, String>>,
    queried: Mutex<Vec<String>>,
    seq: AtomicU64,
    detach_calls: AtomicUsize,
    detached: AtomicBool,
    /// 文档加载完成的时刻；None 表示一开始就已加载
    loaded_at: Mutex<Option<Instant>>,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_location(&self, url: &str) {
        *self.location.lock().unwrap() = Some(url.to_string());
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.texts.lock().unwrap().insert(selector.to_string(), text.to_string());
    }

    pub fn remove_text(&self, selector: &str) {
        self.texts.lock().unwrap().remove(selector);
    }

    pub fn set_last_text(&self, selector: &str, text: &str) {
        self.last_texts.lock().unwrap().insert(selector.to_string(), text.to_string());
    }

    /// 在 `at` 之前报告"尚未加载"
    pub fn set_loaded_at(&self, at: Instant) {
        *self.loaded_at.lock().unwrap() = Some(at);
    }

    pub fn set_storage(&self, key: &str, value: &str) {
        self.storage.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    /// 是否查询过某个选择器
    pub fn was_queried(&self, selector: &str) -> bool {
        self.queried.lock().unwrap().iter().any(|s| s == selector)
    }

    pub fn queried_matching(&self, prefix: &str) -> usize {
        self.queried.lock().unwrap().iter().filter(|s| s.starts_with(prefix)).count()
    }

    pub fn query_count(&self) -> usize {
        self.queried.lock().unwrap().len()
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn record(&self, selector: &str) {
        self.queried.lock().unwrap().push(selector.to_string());
    }
}

#[async_trait]
impl PageProbe for FakeProbe {
    async fn location(&self) -> Result<Option<String>> {
        Ok(self.location.lock().unwrap().clone())
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        self.record(selector);
        Ok(self.texts.lock().unwrap().get(selector).cloned())
    }

    async fn last_text_of(&self, selector: &str) -> Result<Option<String>> {
        self.record(selector);
        Ok(self.last_texts.lock().unwrap().get(selector).cloned())
    }

    async fn local_storage_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.storage.lock().unwrap().get(key).cloned())
    }

    async fn mutation_seq(&self) -> Result<Option<u64>> {
        Ok(Some(self.seq.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl HiddenDocument for FakeProbe {
    async fn is_loaded(&self, _url: &str) -> Result<bool> {
        Ok(self.loaded_at.lock().unwrap().map_or(true, |at| Instant::now() >= at))
    }

    async fn detach(&self) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        self.detached.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 总是返回同一个 FakeProbe 的宿主
pub struct FakeHost {
    pub doc: Arc<FakeProbe>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new(doc: Arc<FakeProbe>) -> Self {
        Self {
            doc,
            opened: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentHost for FakeHost {
    async fn open_hidden(&self, url: &str) -> Result<Arc<dyn HiddenDocument>> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(self.doc.clone())
    }
}
