//! 应用装配 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开状态文件、连接浏览器、创建 JsExecutor
//! 2. **组件装配**：客户端 → 协调器 → 请求路由 → 提交流程 → 观察器
//! 3. **后台任务**：请求路由、控制通道（stdin/stdout JSON 行）、计数广播日志
//! 4. **启动动作**：初次统计，开启自动同步时执行一次批量同步
//! 5. **资源管理**：唯一持有 Browser 的模块

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::browser;
use crate::clients::{GithubAuth, GithubClient, LeetcodeClient, LeetcodeSession};
use crate::config::Config;
use crate::infrastructure::{DomProbe, FrameHost, JsExecutor};
use crate::models::{Request, StatsUpdate};
use crate::orchestrator::{MessageClient, MessageRouter, SyncCoordinator};
use crate::services::{FailureLog, PageNotifier, ProblemExtractor, SolvedProblemSync};
use crate::storage::StateStore;
use crate::utils::logging::log_startup;
use crate::workflow::{SubmissionFlow, SubmissionWatcher};

/// 请求通道容量
const REQUEST_BUFFER: usize = 32;

/// 复用已打开标签页时匹配的地址片段
const TRACKED_HOST: &str = "leetcode.com";

/// 应用主结构
pub struct App {
    _browser: Browser,
    store: Arc<StateStore>,
    coordinator: SyncCoordinator,
    watcher: SubmissionWatcher,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let store = Arc::new(StateStore::open(&config.state_file).await?);
        if store.install_defaults()? {
            info!("✓ 已写入默认设置");
        }

        // 连接浏览器
        let (browser, page) = if config.headless {
            browser::launch_headless_browser(&config.target_url, config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.target_url, Some(TRACKED_HOST))
                .await?
        };

        // 创建 JsExecutor（持有 page）
        let executor = JsExecutor::new(page);

        // ========== 协调器与请求路由 ==========
        let repository = Arc::new(GithubClient::new(&config, store.clone()));
        let session = Arc::new(LeetcodeSession::new(executor.clone(), &config.leetcode_base_url));
        let coordinator = SyncCoordinator::new(
            store.clone(),
            repository.clone(),
            Arc::new(LeetcodeClient::new(&config)),
            Arc::new(SolvedProblemSync::new(session, repository.clone())),
        )?;

        let router = Arc::new(MessageRouter::new(
            coordinator.clone(),
            store.clone(),
            Arc::new(GithubAuth::new(&config)),
            config.data_config(),
        ));
        let (messages, requests) = MessageClient::channel(REQUEST_BUFFER);
        tokio::spawn(router.serve(requests));
        tokio::spawn(log_stats_updates(coordinator.subscribe()));
        {
            let messages = messages.clone();
            tokio::spawn(async move {
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                let mut stdout = tokio::io::stdout();
                if let Err(e) = serve_control_channel(stdin, &mut stdout, messages).await {
                    warn!("控制通道已关闭: {}", e);
                }
            });
        }

        // ========== 页面端 ==========
        let probe = Arc::new(DomProbe::main(executor.clone()));
        let extractor = Arc::new(ProblemExtractor::new(
            probe.clone(),
            Arc::new(FrameHost::new(executor.clone())),
            config.frame_load_timeout(),
            config.metadata_timeout(),
            config.poll_interval(),
        ));
        let notifier = Arc::new(PageNotifier::new(executor));
        let flow = Arc::new(SubmissionFlow::new(
            extractor.clone(),
            repository,
            notifier.clone(),
            FailureLog::with_path(config.failure_log_file.clone()),
            store.clone(),
            messages.clone(),
            config.retry_delay(),
        ));
        let watcher = SubmissionWatcher::new(
            probe,
            extractor,
            flow,
            notifier,
            messages,
            config.poll_interval(),
            config.cooldown(),
        );

        Ok(Self {
            _browser: browser,
            store,
            coordinator,
            watcher,
        })
    }

    /// 运行应用主逻辑，直到收到 Ctrl+C
    pub async fn run(self) -> Result<()> {
        self.startup_actions().await?;

        tokio::select! {
            _ = self.watcher.run() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("监听退出信号失败: {}", e);
                }
                info!("👋 收到退出信号，程序结束");
            }
        }
        Ok(())
    }

    async fn startup_actions(&self) -> Result<()> {
        let state = self.store.snapshot()?;
        let configured = state.credentials().is_ok();

        if configured && state.auto_sync() {
            // 同步成功后会自行重新统计
            info!("🔄 已开启自动同步");
            self.coordinator.start_sync();
        }

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move { coordinator.init_counter().await });
        Ok(())
    }
}

/// 计数变化写入日志
async fn log_stats_updates(mut updates: broadcast::Receiver<StatsUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => match serde_json::to_string(&update) {
                Ok(json) => info!("📊 {}", json),
                Err(e) => warn!("无法序列化计数: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => debug!("跳过了 {} 条计数广播", skipped),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// 控制通道：每行一个 JSON 请求，每个请求回复一行 JSON
pub async fn serve_control_channel<R, W>(reader: R, writer: &mut W, messages: MessageClient) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = messages.send(Request::parse_line(&line)).await;
        let mut json = serde_json::to_string(&response)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }
    debug!("控制通道输入结束");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake::{FakeCatalogue, FakeOAuth, FakeRepository};
    use crate::models::{Difficulty, Response};
    use crate::services::fake::ScriptedJob;
    use crate::storage::StoredState;

    #[tokio::test]
    async fn test_control_channel_answers_each_line() {
        let store = Arc::new(StateStore::in_memory(StoredState::default()));
        let coordinator = SyncCoordinator::new(
            store.clone(),
            Arc::new(FakeRepository::default()),
            Arc::new(FakeCatalogue::with_entries(&[("1", Difficulty::Easy)])),
            Arc::new(ScriptedJob::succeeding("ok")),
        )
        .unwrap();
        let router = Arc::new(MessageRouter::new(
            coordinator.clone(),
            store,
            Arc::new(FakeOAuth::new("good", "octocat", "gho_1")),
            Config::default().data_config(),
        ));
        let (messages, requests) = MessageClient::channel(4);
        tokio::spawn(router.serve(requests));

        let input = b"{\"type\":\"updateDifficultyStats\",\"difficulty\":\"Medium\"}\n\nnot json\n{\"type\":\"getStorageConfig\",\"properties\":[\"auto_sync\"]}\n";
        let mut output = Vec::new();
        serve_control_channel(&input[..], &mut output, messages).await.unwrap();

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert!(responses[0].success);
        assert_eq!(responses[1].error.as_deref(), Some("unknown request type"));
        assert!(responses[2].success);
        assert_eq!(coordinator.snapshot().medium, 1);
    }

    #[tokio::test]
    async fn test_stats_logger_stops_when_closed() {
        let (tx, rx) = broadcast::channel(4);
        let logger = tokio::spawn(log_stats_updates(rx));
        tx.send(StatsUpdate {
            data: Default::default(),
        })
        .unwrap();
        drop(tx);
        logger.await.unwrap();
    }
}
