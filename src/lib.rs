//! # LeetCode Tracker
//!
//! 通过 Chrome DevTools Protocol 观察 LeetCode 页面，把通过的题解自动提交到 GitHub 仓库
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `DomProbe` / `FrameHost` - 查询主文档、创建隐藏文档
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/` - 题目提取、页面提示、失败记录、难度对账、批量同步
//! - `clients/` - GitHub 仓库与授权、LeetCode 题库与会话
//!
//! ### ③ 流程层（Workflow）
//! - `SubmissionWatcher` - 观察 DOM 变更，检测 Accepted（冷却状态机）
//! - `SubmissionFlow` - 一次 Accepted 的完整处理（提取 → 提交 → 通知）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/sync_coordinator` - 计数与批量同步状态
//! - `orchestrator/message_router` - 类型化请求分派
//! - `orchestrator/app` - 组件装配与生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{language, Difficulty, ProblemRecord, Request, Response};
pub use orchestrator::{App, SyncCoordinator};
pub use workflow::{SubmissionFlow, SubmissionWatcher};
