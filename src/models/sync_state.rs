use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::problem::Difficulty;

/// 已解决题目计数，协调器持有的唯一真相
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounters {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
    pub is_complete: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub loading: bool,
}

impl Default for SyncCounters {
    fn default() -> Self {
        Self {
            easy: 0,
            medium: 0,
            hard: 0,
            is_complete: false,
            last_update: None,
            loading: true,
        }
    }
}

impl SyncCounters {
    /// 从难度序列重新统计，未知难度忽略
    pub fn tally<'a>(difficulties: impl IntoIterator<Item = &'a Difficulty>, now: DateTime<Utc>) -> Self {
        let mut counters = Self {
            is_complete: true,
            loading: false,
            last_update: Some(now),
            ..Self::default()
        };
        for difficulty in difficulties {
            match difficulty {
                Difficulty::Easy => counters.easy += 1,
                Difficulty::Medium => counters.medium += 1,
                Difficulty::Hard => counters.hard += 1,
                Difficulty::Unknown => {}
            }
        }
        counters
    }

    /// 返回加一后的新快照；未知难度返回 None
    pub fn incremented(&self, difficulty: Difficulty, now: DateTime<Utc>) -> Option<Self> {
        let mut next = self.clone();
        match difficulty {
            Difficulty::Easy => next.easy += 1,
            Difficulty::Medium => next.medium += 1,
            Difficulty::Hard => next.hard += 1,
            Difficulty::Unknown => return None,
        }
        next.last_update = Some(now);
        Some(next)
    }

    pub fn total(&self) -> u32 {
        self.easy + self.medium + self.hard
    }
}

/// 最近一次同步的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastStatus {
    #[default]
    None,
    Success,
    Failed,
}

/// 持久化的同步状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncStatus {
    pub last_status: LastStatus,
    pub in_progress: bool,
    pub last_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            last_status: LastStatus::None,
            in_progress: false,
            last_message: "尚未进行同步".to_string(),
            last_sync_at: None,
        }
    }
}

impl SyncStatus {
    /// 同步结束时写入的最终状态
    pub fn finished(success: bool, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            last_status: if success { LastStatus::Success } else { LastStatus::Failed },
            in_progress: false,
            last_message: message.into(),
            last_sync_at: Some(at),
        }
    }
}

/// 计数变化时广播的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "statsUpdate")]
pub struct StatsUpdate {
    pub data: SyncCounters,
}
