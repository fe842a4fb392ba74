//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责组件装配和后台状态，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用装配
//! - 管理应用生命周期（初始化、运行）
//! - 管理浏览器资源（Browser、JsExecutor）
//! - 启动请求路由、控制通道和观察器
//!
//! ### `sync_coordinator` - 同步状态协调器
//! - 持有已解决题目计数，广播每次变化
//! - 批量同步的互斥与结果持久化
//!
//! ### `message_router` - 请求路由
//! - 类型化请求 → 类型化响应
//! - 无法识别的请求有明确的默认响应
//!
//! ## 层次关系
//!
//! ```text
//! app (装配 + 生命周期)
//!     ↓
//! workflow::SubmissionWatcher ──Request──▶ message_router ──▶ sync_coordinator
//!     ↓                                                          ↓
//! workflow::SubmissionFlow                                 services / clients
//!     ↓
//! services (能力层：extractor / notifier / failure_log)
//!     ↓
//! infrastructure (基础设施：JsExecutor / DomProbe)
//! ```

pub mod app;
pub mod message_router;
pub mod sync_coordinator;

pub use app::App;
pub use message_router::{MessageClient, MessageRouter};
pub use sync_coordinator::SyncCoordinator;
