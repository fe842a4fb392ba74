//! 提交观察器 - 流程层
//!
//! 状态机只有两个状态：空闲、冷却中。
//!
//! 每次轮询：
//! 1. 地址变化 → 开始新题目的元数据抓取 / 捕获 GitHub 授权码
//! 2. DOM 变更 → 冷却期外按顺序检查结果探针，命中 Accepted 后立即记录时间，
//!    再在独立任务中运行 [`SubmissionFlow`]
//!
//! 观察过程中的任何错误都只记录日志，循环不会停止。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::infrastructure::PageProbe;
use crate::models::{ProblemUrl, Request};
use crate::orchestrator::MessageClient;
use crate::services::problem_extractor::resolve_problem_url;
use crate::services::{Notifier, ProblemExtractor, ToastKind};
use crate::workflow::submission_ctx::{share_metadata, MetadataFuture, SubmissionCtx};
use crate::workflow::submission_flow::SubmissionFlow;

/// 检测状态：上一次 Accepted 的时间
#[derive(Debug, Clone)]
pub struct DetectionState {
    last_accepted: Option<Instant>,
    cooldown: Duration,
}

impl DetectionState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_accepted: None,
            cooldown,
        }
    }

    /// 是否仍在冷却期内
    pub fn in_cooldown(&self, now: Instant) -> bool {
        matches!(self.last_accepted, Some(at) if now.saturating_duration_since(at) < self.cooldown)
    }

    /// 记录一次真实的检测
    pub fn record(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }
}

/// 结果探针：选择器 + 判定
#[derive(Clone, Copy)]
pub struct ResultProbe {
    pub selector: &'static str,
    pub matches: fn(&str) -> bool,
}

fn shows_accepted(text: &str) -> bool {
    text.contains("Accepted")
}

/// 按优先级排列，第一个命中的生效
pub const RESULT_PROBES: [ResultProbe; 5] = [
    ResultProbe {
        selector: r#"[data-e2e-locator="submission-result"]"#,
        matches: shows_accepted,
    },
    ResultProbe {
        selector: ".text-green-s",
        matches: shows_accepted,
    },
    ResultProbe {
        selector: ".text-green-500",
        matches: shows_accepted,
    },
    ResultProbe {
        selector: r#"span[class*="text-green"]"#,
        matches: shows_accepted,
    },
    ResultProbe {
        selector: r#"div[class*="text-green"]"#,
        matches: shows_accepted,
    },
];

/// GitHub 授权回调地址中的授权码
pub fn oauth_code(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// 当前题目及其元数据抓取
struct ActiveProblem {
    url: ProblemUrl,
    metadata: MetadataFuture,
}

/// 提交观察器
pub struct SubmissionWatcher {
    probe: Arc<dyn PageProbe>,
    extractor: Arc<ProblemExtractor>,
    flow: Arc<SubmissionFlow>,
    notifier: Arc<dyn Notifier>,
    messages: MessageClient,
    detection: DetectionState,
    poll_interval: Duration,
    active: Option<ActiveProblem>,
    last_location: Option<String>,
    last_seq: Option<u64>,
    handled_codes: HashSet<String>,
}

impl SubmissionWatcher {
    pub fn new(
        probe: Arc<dyn PageProbe>,
        extractor: Arc<ProblemExtractor>,
        flow: Arc<SubmissionFlow>,
        notifier: Arc<dyn Notifier>,
        messages: MessageClient,
        poll_interval: Duration,
        cooldown: Duration,
    ) -> Self {
        Self {
            probe,
            extractor,
            flow,
            notifier,
            messages,
            detection: DetectionState::new(cooldown),
            poll_interval,
            active: None,
            last_location: None,
            last_seq: None,
            handled_codes: HashSet::new(),
        }
    }

    /// 持续观察，永不返回
    pub async fn run(mut self) {
        info!("👀 开始观察提交结果...");
        loop {
            self.tick().await;
            sleep(self.poll_interval).await;
        }
    }

    /// 一次轮询
    pub async fn tick(&mut self) {
        match self.probe.location().await {
            Ok(Some(location)) if self.last_location.as_deref() != Some(location.as_str()) => {
                self.on_navigation(location);
            }
            Ok(_) => {}
            Err(e) => debug!("读取页面地址失败: {}", e),
        }

        match self.probe.mutation_seq().await {
            Ok(Some(seq)) if self.last_seq != Some(seq) => {
                self.last_seq = Some(seq);
                if self.check_submission_result(Instant::now()).await {
                    self.on_accepted();
                }
            }
            Ok(_) => {}
            Err(e) => {
                // 页面刷新后观察器会丢失，下次轮询重新安装
                debug!("读取变更序号失败: {}", e);
                self.last_seq = None;
            }
        }
    }

    /// 冷却期外按顺序检查结果探针；命中时先记录时间再返回
    pub async fn check_submission_result(&mut self, now: Instant) -> bool {
        if self.detection.in_cooldown(now) {
            return false;
        }

        for probe in RESULT_PROBES {
            match self.probe.text_of(probe.selector).await {
                Ok(Some(text)) if (probe.matches)(&text) => {
                    info!("✅ 检测到 Accepted ({})", probe.selector);
                    self.detection.record(now);
                    return true;
                }
                Ok(_) => {}
                Err(e) => debug!("结果探针 {} 查询失败: {}", probe.selector, e),
            }
        }
        false
    }

    fn on_navigation(&mut self, location: String) {
        debug!("页面地址变化: {}", location);

        if let Some(code) = oauth_code(&location) {
            self.forward_oauth_code(code);
        }

        match resolve_problem_url(&location) {
            Some(url) => {
                let same_problem = self.active.as_ref().is_some_and(|active| active.url == url);
                if !same_problem {
                    info!("📄 进入题目 {}", url.path);
                    self.active = Some(self.start_metadata(url));
                }
            }
            None => self.active = None,
        }

        self.last_location = Some(location);
    }

    /// 开始抓取元数据；立即在后台驱动，提交流程稍后等待同一个结果
    fn start_metadata(&self, url: ProblemUrl) -> ActiveProblem {
        let extractor = Arc::clone(&self.extractor);
        let target = url.clone();
        let metadata = share_metadata(async move { extractor.extract_metadata(&target).await });
        tokio::spawn(metadata.clone());
        ActiveProblem { url, metadata }
    }

    fn forward_oauth_code(&mut self, code: String) {
        if !self.handled_codes.insert(code.clone()) {
            return;
        }

        info!("🔑 捕获到 GitHub 授权码");
        let messages = self.messages.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let response = messages.send(Request::Authenticate { code }).await;
            if response.success {
                notifier.show_toast("LeetCode Tracker: GitHub 已连接", ToastKind::Success).await;
            } else {
                let reason = response.error.unwrap_or_default();
                warn!("授权失败: {}", reason);
                notifier.show_toast(&format!("授权失败: {}", reason), ToastKind::Error).await;
            }
        });
    }

    fn on_accepted(&self) {
        let Some(active) = &self.active else {
            warn!("检测到 Accepted，但当前不在题目页");
            return;
        };

        let ctx = SubmissionCtx::new(active.url.clone(), active.metadata.clone(), Utc::now());
        let flow = Arc::clone(&self.flow);
        tokio::spawn(async move {
            let result = flow.run(&ctx).await;
            debug!("{} 处理结束: {:?}", ctx, result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake::FakeRepository;
    use crate::infrastructure::fake::{FakeHost, FakeProbe};
    use crate::models::Response;
    use crate::orchestrator::message_router::Envelope;
    use crate::services::fake::RecordingNotifier;
    use crate::services::problem_extractor::GLOBAL_LANG_KEY;
    use crate::services::FailureLog;
    use crate::storage::{StateStore, StoredState};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct Harness {
        watcher: SubmissionWatcher,
        page: Arc<FakeProbe>,
        hidden: Arc<FakeProbe>,
        host: Arc<FakeHost>,
        repo: Arc<FakeRepository>,
        notifier: Arc<RecordingNotifier>,
        requests: Arc<Mutex<Vec<Request>>>,
        _dir: tempfile::TempDir,
    }

    fn answer_requests(mut rx: mpsc::Receiver<Envelope>, seen: Arc<Mutex<Vec<Request>>>) {
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                seen.lock().unwrap().push(envelope.request);
                let _ = envelope.reply.send(Response::ok());
            }
        });
    }

    fn harness() -> Harness {
        let page = FakeProbe::new();
        let hidden = FakeProbe::new();
        let host = Arc::new(FakeHost::new(hidden.clone()));
        let extractor = Arc::new(ProblemExtractor::new(
            page.clone(),
            host.clone(),
            Duration::from_millis(10_000),
            Duration::from_millis(3000),
            Duration::from_millis(100),
        ));
        let repo = Arc::new(FakeRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let dir = tempfile::tempdir().unwrap();
        let (messages, rx) = MessageClient::channel(8);
        let requests = Arc::new(Mutex::new(Vec::new()));
        answer_requests(rx, requests.clone());

        let flow = Arc::new(SubmissionFlow::new(
            extractor.clone(),
            repo.clone(),
            notifier.clone(),
            FailureLog::with_path(dir.path().join("failures.txt").display().to_string()),
            Arc::new(StateStore::in_memory(StoredState::default())),
            messages.clone(),
            Duration::from_millis(1000),
        ));
        let watcher = SubmissionWatcher::new(
            page.clone(),
            extractor,
            flow,
            notifier.clone(),
            messages,
            Duration::from_millis(250),
            Duration::from_secs(10),
        );
        Harness {
            watcher,
            page,
            hidden,
            host,
            repo,
            notifier,
            requests,
            _dir: dir,
        }
    }

    #[test]
    fn test_cooldown_window() {
        let mut state = DetectionState::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(!state.in_cooldown(t0));

        state.record(t0);
        assert!(state.in_cooldown(t0 + Duration::from_millis(9999)));
        assert!(!state.in_cooldown(t0 + Duration::from_millis(10001)));
    }

    #[test]
    fn test_oauth_code() {
        assert_eq!(oauth_code("https://github.com/?code=abc123").as_deref(), Some("abc123"));
        assert_eq!(oauth_code("https://github.com/login?state=x&code=q").as_deref(), Some("q"));
        assert!(oauth_code("https://github.com/?code=").is_none());
        assert!(oauth_code("https://leetcode.com/?code=abc").is_none());
        assert!(oauth_code("https://github.com/alice").is_none());
    }

    #[tokio::test]
    async fn test_detections_inside_cooldown_are_suppressed() {
        let mut h = harness();
        h.page.set_text(".text-green-500", "Accepted");
        let t0 = Instant::now();

        assert!(h.watcher.check_submission_result(t0).await);
        let queries = h.page.query_count();

        assert!(!h.watcher.check_submission_result(t0 + Duration::from_millis(9999)).await);
        assert_eq!(h.page.query_count(), queries, "冷却期内不查询页面");

        assert!(h.watcher.check_submission_result(t0 + Duration::from_millis(10001)).await);
    }

    #[tokio::test]
    async fn test_probes_checked_in_order() {
        let mut h = harness();
        h.page.set_text(RESULT_PROBES[0].selector, "Wrong Answer");
        h.page.set_text(RESULT_PROBES[1].selector, "Accepted");
        h.page.set_text(RESULT_PROBES[2].selector, "Accepted");

        assert!(h.watcher.check_submission_result(Instant::now()).await);
        assert!(h.page.was_queried(RESULT_PROBES[0].selector));
        assert!(h.page.was_queried(RESULT_PROBES[1].selector));
        assert!(!h.page.was_queried(RESULT_PROBES[2].selector), "第一个命中后停止");
    }

    #[tokio::test]
    async fn test_green_text_without_accepted_is_ignored() {
        let mut h = harness();
        h.page.set_text(".text-green-s", "Runtime 0 ms, beats 100%");

        assert!(!h.watcher.check_submission_result(Instant::now()).await);
        assert!(!h.watcher.detection.in_cooldown(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_starts_metadata_once_per_problem() {
        let mut h = harness();
        h.page.set_location("https://leetcode.com/problems/two-sum/description/");
        h.watcher.tick().await;
        h.page.set_location("https://leetcode.com/problems/two-sum/submissions/1/");
        h.watcher.tick().await;
        sleep(Duration::from_millis(10)).await;

        assert_eq!(
            h.host.opened.lock().unwrap().as_slice(),
            ["https://leetcode.com/problems/two-sum/description/"]
        );

        h.page.set_location("https://leetcode.com/problemset/");
        h.watcher.tick().await;
        assert!(h.watcher.active.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oauth_code_forwarded_once() {
        let mut h = harness();
        h.page.set_location("https://github.com/?code=abc");
        h.watcher.tick().await;
        h.page.set_location("https://github.com/settings");
        h.watcher.tick().await;
        h.page.set_location("https://github.com/?code=abc");
        h.watcher.tick().await;
        sleep(Duration::from_millis(10)).await;

        assert_eq!(
            h.requests.lock().unwrap().as_slice(),
            [Request::Authenticate { code: "abc".to_string() }]
        );
        assert_eq!(h.notifier.toasts()[0].1, ToastKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_submission_end_to_end() {
        let mut h = harness();
        h.page.set_location("https://leetcode.com/problems/two-sum/");
        h.page.set_storage(GLOBAL_LANG_KEY, "\"python3\"");
        h.page.set_last_text("code.language-python", "class Solution: pass");
        h.hidden.set_text("div.text-difficulty-easy", "Easy");
        h.hidden.set_text(r#"div[data-track-load="description_content"]"#, "Given an array");
        h.hidden.set_text("a[href='/problems/two-sum/']", "1. Two Sum");

        h.watcher.tick().await;
        h.page.set_text(r#"[data-e2e-locator="submission-result"]"#, "Accepted");
        h.watcher.tick().await;
        sleep(Duration::from_millis(500)).await;

        let submitted = h.repo.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].slug, "1-TwoSum");
        assert_eq!(submitted[0].language.file_extension, ".py");
        assert!(h.hidden.is_detached());

        // 冷却期内同一标记不会再次提交
        h.watcher.tick().await;
        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.repo.submitted().len(), 1);
        assert!(h
            .requests
            .lock()
            .unwrap()
            .contains(&Request::UpdateDifficultyStats {
                difficulty: Some("easy".to_string())
            }));
    }
}
