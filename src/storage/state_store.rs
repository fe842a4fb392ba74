//! 本地持久化状态
//!
//! 凭据、功能开关和同步状态保存在一个 TOML 文件中。
//! 所有写入都是短小的“读-改-写”操作：状态锁内只修改内存并序列化，
//! 写文件在单独的写锁内完成，过期的版本不会覆盖较新的文件。

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ConfigError, StorageError};
use crate::models::SyncStatus;

/// 持久化的键值内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// 仓库所有者，缺省时使用 `username`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_submit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_multiple_submission: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_submission: Option<bool>,
    // 表必须放在普通键之后
    pub sync_status: SyncStatus,
}

/// 访问仓库所需的全部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCredentials {
    pub owner: String,
    pub repo: String,
    pub username: String,
    pub token: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl StoredState {
    /// 取出凭据；缺项时返回“配置不完整”
    pub fn credentials(&self) -> Result<RepoCredentials, ConfigError> {
        let username = non_empty(&self.username);
        let token = non_empty(&self.token);
        let repo = non_empty(&self.repo);

        match (username, token, repo) {
            (Some(username), Some(token), Some(repo)) => Ok(RepoCredentials {
                owner: non_empty(&self.repo_owner).unwrap_or(username).to_string(),
                repo: repo.to_string(),
                username: username.to_string(),
                token: token.to_string(),
            }),
            _ => {
                let mut missing = Vec::new();
                if username.is_none() {
                    missing.push("username");
                }
                if token.is_none() {
                    missing.push("token");
                }
                if repo.is_none() {
                    missing.push("repo");
                }
                Err(ConfigError::Incomplete { missing })
            }
        }
    }

    pub fn auto_sync(&self) -> bool {
        self.auto_sync.unwrap_or(true)
    }

    pub fn code_submit(&self) -> bool {
        self.code_submit.unwrap_or(true)
    }

    pub fn sync_multiple_submission(&self) -> bool {
        self.sync_multiple_submission.unwrap_or(false)
    }

    pub fn comment_submission(&self) -> bool {
        self.comment_submission.unwrap_or(false)
    }
}

struct Versioned {
    state: StoredState,
    version: u64,
}

/// 本地状态存储
pub struct StateStore {
    path: Option<PathBuf>,
    current: Mutex<Versioned>,
    /// 已写入文件的版本
    written: Mutex<u64>,
}

impl StateStore {
    /// 从文件加载；文件不存在时以空状态开始
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if fs::try_exists(&path).await.unwrap_or(false) {
            let content = fs::read_to_string(&path).await.map_err(|e| {
                AppError::Storage(StorageError::ReadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            toml::from_str(&content).map_err(|e| {
                AppError::Storage(StorageError::TomlParseFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?
        } else {
            info!("状态文件 {} 不存在，使用空状态", path.display());
            StoredState::default()
        };

        Ok(Self::with_path(Some(path), state))
    }

    /// 仅保存在内存中的存储
    pub fn in_memory(state: StoredState) -> Self {
        Self::with_path(None, state)
    }

    fn with_path(path: Option<PathBuf>, state: StoredState) -> Self {
        Self {
            path,
            current: Mutex::new(Versioned { state, version: 0 }),
            written: Mutex::new(0),
        }
    }

    /// 当前状态的副本
    pub fn snapshot(&self) -> AppResult<StoredState> {
        let guard = self.current.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.state.clone())
    }

    /// 原子地修改状态并落盘
    ///
    /// 修改在状态锁内完成；写文件失败时内存中的新状态仍然生效，错误返回给调用方。
    pub fn update<R>(&self, mutate: impl FnOnce(&mut StoredState) -> R) -> AppResult<R> {
        let (content, version, result) = {
            let mut guard = self.current.lock().map_err(|_| StorageError::Poisoned)?;
            let mut next = guard.state.clone();
            let result = mutate(&mut next);
            if next == guard.state {
                return Ok(result);
            }

            let content = match self.path {
                Some(_) => Some(toml::to_string_pretty(&next)?),
                None => None,
            };
            guard.state = next;
            guard.version += 1;
            (content, guard.version, result)
        };

        if let Some(content) = content {
            self.persist(version, &content)?;
        }
        Ok(result)
    }

    /// 安装缺省开关，只补齐不存在的项；返回是否有改动
    pub fn install_defaults(&self) -> AppResult<bool> {
        self.update(|state| {
            let mut changed = false;
            for (slot, value) in [
                (&mut state.auto_sync, true),
                (&mut state.code_submit, true),
                (&mut state.sync_multiple_submission, false),
                (&mut state.comment_submission, false),
            ] {
                if slot.is_none() {
                    *slot = Some(value);
                    changed = true;
                }
            }
            changed
        })
    }

    /// 按键名读取若干项，不存在的键不出现在结果里
    pub fn properties(&self, keys: &[String]) -> AppResult<Map<String, JsonValue>> {
        let state = self.snapshot()?;
        let JsonValue::Object(all) = serde_json::to_value(&state)? else {
            return Ok(Map::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| all.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    fn persist(&self, version: u64, content: &str) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut written = self.written.lock().map_err(|_| StorageError::Poisoned)?;
        if *written >= version {
            debug!("跳过过期的状态版本 {}", version);
            return Ok(());
        }

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(|e| AppError::file_write_failed(tmp.display().to_string(), e))?;
        std::fs::rename(&tmp, path).map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        *written = version;
        debug!("状态已写入 {}", path.display());
        Ok(())
    }
}
