//! 同步状态协调器
//!
//! 持有已解决题目的计数，负责：
//! - 单次加一（页面端提交成功后）
//! - 全量重新统计（仓库题目 × 题库难度）
//! - 批量同步的互斥、结果持久化
//!
//! 计数只在协调器内部的锁里修改，每次变化都通过 broadcast 通知订阅者。

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::clients::{ProblemCatalogue, RemoteRepository};
use crate::error::AppResult;
use crate::models::{Difficulty, StatsUpdate, SyncCounters, SyncStatus};
use crate::services::{reconcile, SyncJob, SyncOutcome};
use crate::storage::StateStore;

const BROADCAST_CAPACITY: usize = 64;

struct Inner {
    store: Arc<StateStore>,
    repository: Arc<dyn RemoteRepository>,
    catalogue: Arc<dyn ProblemCatalogue>,
    job: Arc<dyn SyncJob>,
    counters: Mutex<SyncCounters>,
    updates: broadcast::Sender<StatsUpdate>,
}

/// 同步状态协调器，clone 后共享同一份状态
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// 创建协调器；上次异常退出遗留的"同步中"标记会被清除
    pub fn new(
        store: Arc<StateStore>,
        repository: Arc<dyn RemoteRepository>,
        catalogue: Arc<dyn ProblemCatalogue>,
        job: Arc<dyn SyncJob>,
    ) -> AppResult<Self> {
        let cleared = store.update(|state| {
            let stale = state.sync_status.in_progress;
            state.sync_status.in_progress = false;
            stale
        })?;
        if cleared {
            warn!("⚠️ 清除了上次遗留的同步中标记");
        }

        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                repository,
                catalogue,
                job,
                counters: Mutex::new(SyncCounters::default()),
                updates,
            }),
        })
    }

    /// 订阅计数变化
    pub fn subscribe(&self) -> broadcast::Receiver<StatsUpdate> {
        self.inner.updates.subscribe()
    }

    /// 当前计数
    pub fn snapshot(&self) -> SyncCounters {
        self.inner
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 替换计数并广播；没有订阅者不算错误
    fn publish(&self, counters: SyncCounters) {
        *self.inner.counters.lock().unwrap_or_else(PoisonError::into_inner) = counters.clone();
        let _ = self.inner.updates.send(StatsUpdate { data: counters });
    }

    /// 对应难度加一，只接受 easy / medium / hard（大小写不敏感，两端不能有空白）
    pub fn increment_one(&self, difficulty: Option<&str>) -> bool {
        let difficulty = difficulty.map(Difficulty::parse).unwrap_or_default();
        let next = {
            let mut counters = self.inner.counters.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(next) = counters.incremented(difficulty, Utc::now()) else {
                return false;
            };
            *counters = next.clone();
            next
        };

        info!("📈 {} +1，共 {} 道", difficulty, next.total());
        let _ = self.inner.updates.send(StatsUpdate { data: next });
        true
    }

    /// 从头统计
    pub fn recount(&self, difficulties: &[Difficulty]) {
        let counters = SyncCounters::tally(difficulties, Utc::now());
        info!(
            "📊 重新统计: easy={} medium={} hard={}",
            counters.easy, counters.medium, counters.hard
        );
        self.publish(counters);
    }

    /// 回到"加载中"
    pub fn reset(&self) {
        self.publish(SyncCounters::default());
    }

    /// 统计结束但没有数据（未配置 / 题库不可用）
    fn finish_empty(&self) {
        let mut counters = self.snapshot();
        counters.loading = false;
        counters.is_complete = true;
        self.publish(counters);
    }

    /// 按仓库内容重新统计
    pub async fn init_counter(&self) {
        let configured = match self.inner.store.snapshot() {
            Ok(state) => state.credentials().is_ok(),
            Err(e) => {
                error!("读取本地状态失败: {}", e);
                false
            }
        };

        if !configured {
            info!("未配置仓库，计数归零");
            self.publish(SyncCounters {
                loading: false,
                is_complete: true,
                ..SyncCounters::default()
            });
            return;
        }

        self.reset();
        let (tracked, catalogue) = tokio::join!(
            self.inner.repository.list_tracked_problems(),
            self.inner.catalogue.fetch_catalogue()
        );

        match catalogue {
            Ok(catalogue) => self.recount(&reconcile(&tracked, &catalogue)),
            Err(e) => {
                warn!("获取题库失败，无法统计: {}", e);
                self.finish_empty();
            }
        }
    }

    /// 执行一次批量同步
    ///
    /// 同一时间只允许一个同步；结束后写入最终状态，成功时重新统计。错误不会向外传播。
    pub async fn run_sync(&self) -> SyncOutcome {
        let started = self.inner.store.update(|state| {
            if state.sync_status.in_progress {
                false
            } else {
                state.sync_status.in_progress = true;
                true
            }
        });

        match started {
            Ok(true) => {}
            Ok(false) => {
                warn!("同步已在进行中，忽略本次请求");
                return SyncOutcome {
                    success: false,
                    message: "同步已在进行中".to_string(),
                };
            }
            Err(e) => {
                error!("无法标记同步开始: {}", e);
                return SyncOutcome {
                    success: false,
                    message: e.to_string(),
                };
            }
        }

        info!("🔄 开始同步已解决题目");
        let outcome = match self.inner.job.run().await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome {
                success: false,
                message: e.to_string(),
            },
        };

        let status = SyncStatus::finished(outcome.success, outcome.message.clone(), Utc::now());
        if let Err(e) = self.inner.store.update(|state| state.sync_status = status) {
            error!("写入同步状态失败: {}", e);
        }

        if outcome.success {
            info!("✅ {}", outcome.message);
            self.init_counter().await;
        } else {
            warn!("❌ 同步失败: {}", outcome.message);
        }
        outcome
    }

    /// 在后台执行同步，不等待结果
    pub fn start_sync(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_sync().await;
        });
    }
}
