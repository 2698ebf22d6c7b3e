//! 回合状态：Idle → AwaitingModel → (ToolRequested → AwaitingModelResumption)? → Idle
//!
//! Orchestrator 通过 watch 通道发布当前阶段，UI 订阅后渲染「Agents coordinating...」等提示。

use serde::Serialize;

/// 单个回合所处阶段
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    /// 已发送用户消息，等待模型首次回复
    AwaitingModel,
    /// 模型请求了工具，正在分发
    ToolRequested,
    /// 工具结果已回传，等待模型续写
    AwaitingModelResumption,
}

/// 回合结束方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// 模型正常给出最终回复
    Completed,
    /// 模型未配置，返回固定提示
    Advisory,
    /// 模型调用失败，返回通用错误提示
    Failed,
}

/// handle_turn 的返回值：最终文本 + 触发的工具（若有）
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_called: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<serde_json::Value>,
    pub status: TurnStatus,
}

impl TurnReply {
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_called: None,
            tool_result: None,
            status: TurnStatus::Completed,
        }
    }

    pub fn advisory(text: impl Into<String>) -> Self {
        Self {
            status: TurnStatus::Advisory,
            ..Self::completed(text)
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            status: TurnStatus::Failed,
            ..Self::completed(text)
        }
    }
}
