//! 请求路由
//!
//! 页面端（提交流程）和控制通道都把 [`Request`] 放进同一个 mpsc 通道，
//! 由 [`MessageRouter`] 逐个分派，并通过 oneshot 回复 [`Response`]。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::clients::OAuthExchange;
use crate::config::DataConfig;
use crate::models::{Request, Response};
use crate::orchestrator::SyncCoordinator;
use crate::storage::StateStore;

pub const UNKNOWN_REQUEST: &str = "unknown request type";
const CHANNEL_CLOSED: &str = "协调器已停止";

/// 通道里的一条请求及其回复端
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// 发送请求的一端，可随意 clone
#[derive(Clone)]
pub struct MessageClient {
    tx: mpsc::Sender<Envelope>,
}

impl MessageClient {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// 发送请求并等待回复；通道关闭时返回失败响应
    pub async fn send(&self, request: Request) -> Response {
        let (reply, response) = oneshot::channel();
        if self.tx.send(Envelope { request, reply }).await.is_err() {
            return Response::failure(CHANNEL_CLOSED);
        }
        response.await.unwrap_or_else(|_| Response::failure(CHANNEL_CLOSED))
    }
}

/// 请求分派器
pub struct MessageRouter {
    coordinator: SyncCoordinator,
    store: Arc<StateStore>,
    oauth: Arc<dyn OAuthExchange>,
    data_config: DataConfig,
}

impl MessageRouter {
    pub fn new(
        coordinator: SyncCoordinator,
        store: Arc<StateStore>,
        oauth: Arc<dyn OAuthExchange>,
        data_config: DataConfig,
    ) -> Self {
        Self {
            coordinator,
            store,
            oauth,
            data_config,
        }
    }

    /// 处理单个请求，每个变体都有确定的响应
    pub async fn handle(&self, request: Request) -> Response {
        debug!("收到请求: {:?}", request);
        match request {
            Request::UpdateDifficultyStats { difficulty } => {
                Response::from_flag(self.coordinator.increment_one(difficulty.as_deref()))
            }
            Request::GetDataConfig => match serde_json::to_value(&self.data_config) {
                Ok(data) => Response::with_data(data),
                Err(e) => Response::failure(e.to_string()),
            },
            Request::GetStorageConfig { properties } => match self.store.properties(&properties) {
                Ok(map) => Response::with_data(JsonValue::Object(map)),
                Err(e) => Response::failure(e.to_string()),
            },
            Request::SaveUserCredentials { username, token } => {
                let saved = self.store.update(|state| {
                    state.username = Some(username);
                    state.token = Some(token);
                });
                match saved {
                    Ok(()) => Response::ok(),
                    Err(e) => Response::failure(e.to_string()),
                }
            }
            Request::SaveRepository { repository } => {
                if let Err(e) = self.store.update(|state| state.repo = Some(repository)) {
                    return Response::failure(e.to_string());
                }
                // 仓库变化后重新统计
                self.coordinator.init_counter().await;
                Response::ok()
            }
            Request::SyncSolvedProblems => {
                self.coordinator.start_sync();
                Response::ok()
            }
            Request::RequestInitialStats => {
                let coordinator = self.coordinator.clone();
                tokio::spawn(async move { coordinator.init_counter().await });
                match serde_json::to_value(self.coordinator.snapshot()) {
                    Ok(data) => Response::with_data(data),
                    Err(e) => Response::failure(e.to_string()),
                }
            }
            Request::Authenticate { code } => self.authenticate(&code).await,
            Request::Malformed { error } => {
                warn!("请求格式错误: {}", error);
                Response::failure(error)
            }
            Request::Unknown => {
                warn!("无法识别的请求类型");
                Response::failure(UNKNOWN_REQUEST)
            }
        }
    }

    async fn authenticate(&self, code: &str) -> Response {
        let granted = match self.oauth.authenticate(code).await {
            Ok(granted) => granted,
            Err(e) => {
                warn!("授权失败: {}", e);
                return Response::failure(e.to_string());
            }
        };

        let saved = self.store.update(|state| {
            state.username = Some(granted.username);
            state.token = Some(granted.token);
        });
        if let Err(e) = saved {
            return Response::failure(e.to_string());
        }

        self.coordinator.init_counter().await;
        Response::ok()
    }

    /// 持续处理通道中的请求，每个请求在独立任务中处理
    pub async fn serve(self: Arc<Self>, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                let response = router.handle(request).await;
                // 请求方可能已经放弃等待
                let _ = reply.send(response);
            });
        }
        info!("请求通道已关闭");
    }
}
