//! 智能体活动日志：最多保留最近 N 条（默认 50），最新在前，超出直接丢弃

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认保留条数
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// 逻辑子智能体名称（仅用于观测，不是独立运行实体）
pub const ORCHESTRATOR: &str = "Orchestrator";
pub const ORDER_AGENT: &str = "Order Agent";
pub const KITCHEN_AGENT: &str = "Kitchen Agent";
pub const INVENTORY_AGENT: &str = "Inventory Agent";
pub const MENU_AGENT: &str = "Menu Agent";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Thinking,
    Success,
    Failed,
    Warning,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogStatus::Thinking => "thinking",
            LogStatus::Success => "success",
            LogStatus::Failed => "failed",
            LogStatus::Warning => "warning",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLog {
    pub id: String,
    pub agent_name: String,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,
}

impl AgentLog {
    pub fn new(
        agent_name: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
        status: LogStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_name: agent_name.into(),
            action: action.into(),
            details: details.into(),
            timestamp: Utc::now(),
            status,
        }
    }
}

/// 有界日志：push 后截断到 capacity
#[derive(Clone, Debug)]
pub struct LogBook {
    entries: VecDeque<AgentLog>,
    capacity: usize,
}

impl LogBook {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, entry: AgentLog) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// 最新在前
    pub fn entries(&self) -> Vec<AgentLog> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
