//! 对话历史：ChatMessage 与会话内的只追加序列
//!
//! 历史本身不剪枝（供 UI 完整渲染）；发送给模型时可用 window() 只取最近 N 条。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::react::planner::ToolCall;

/// 消息角色：user / model / system（system 为界面提示，如缺少 API Key）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// 本回合触发的工具（只标注在回合结束的 model 消息上）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }
}

/// 单会话历史：只追加
#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: ChatMessage) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// 发给模型的视图：去掉 system 提示，可选只保留最近 limit 条
    pub fn window(&self, limit: Option<usize>) -> Vec<ChatMessage> {
        let dialogue: Vec<&ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let skip = match limit {
            Some(n) if dialogue.len() > n => dialogue.len() - n,
            _ => 0,
        };
        dialogue.into_iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
