//! Planner：模型协作方契约与 Tool Call 解析
//!
//! send：system(提示词 + 工具 schema) + 历史 + 新用户消息 → 模型回复；
//! send_tool_result：在同一回合上追加「工具调用 + Observation」后续写。传输层无状态，续写通过重放本回合实现。
//! parse_llm_output 从文本中提取 `{"tool": "...", "args": {...}}`，提取不到则视为直接回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{ChatMessage, ConversationHistory};

/// 内置 system prompt（config/prompts/system.txt 不存在时使用）
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are 'Nexus', the orchestrator agent of an agentic restaurant.
You help customers explore the menu, get recommendations, place orders and check on them.
Menu questions go through getMenu and recommendDish; orders go through placeOrder and checkOrderStatus.
Tone: professional, efficient, slightly futuristic and friendly.
Rules:
1. Look the menu up with getMenu before answering questions about ingredients or prices you are unsure of.
2. Confirm the items with the customer before calling placeOrder.
3. For requests like 'something spicy', call recommendDish with query 'spicy'.
4. Keep answers concise unless asked for details.
5. If a tool returns an error, apologise and ask for clarification.
6. After placing an order, state the Order ID clearly.";

/// 模型请求的工具调用（{"tool": "placeOrder", "args": {...}}）
/// 只接受 tool / args 两个键，回复里引用的普通 JSON 对象（如菜品）不会被当成工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    #[serde(rename = "tool")]
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// 一次模型回复：要么是文本，要么是工具调用（带工具调用的回复不作为最终文本）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_call: Option<ToolCall>,
}

/// 本回合内已完成的一次工具往返
#[derive(Debug, Clone)]
pub struct ToolRound {
    pub call: ToolCall,
    pub result: Value,
}

/// 解析 LLM 输出：含合法 Tool Call JSON 且 tool 非空则为工具调用，否则整段作为文本
pub fn parse_llm_output(output: &str) -> ModelReply {
    let trimmed = output.trim();

    // 尝试提取 JSON 块（```json ... ``` 或纯 JSON）
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()))
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
            _ => None,
        }
    };

    if let Some(json_str) = json_str {
        match serde_json::from_str::<ToolCall>(json_str) {
            Ok(call) if !call.name.trim().is_empty() => {
                return ModelReply {
                    text: None,
                    tool_call: Some(call),
                };
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("model output is not a tool call: {}", e),
        }
    }

    ModelReply {
        text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        tool_call: None,
    }
}

/// Planner：持有 LLM 与 system prompt
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    /// 每次只发送最近 N 条历史；None 表示全部
    history_limit: Option<usize>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            history_limit: None,
        }
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn base_system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 回合首次调用
    pub async fn send(
        &self,
        history: &ConversationHistory,
        message: &str,
        tool_schema: &str,
    ) -> Result<ModelReply, AgentError> {
        self.send_tool_result(history, message, tool_schema, &[]).await
    }

    /// 回传工具结果后续写；rounds 为本回合已完成的全部工具往返
    pub async fn send_tool_result(
        &self,
        history: &ConversationHistory,
        message: &str,
        tool_schema: &str,
        rounds: &[ToolRound],
    ) -> Result<ModelReply, AgentError> {
        let messages = self.build_messages(history, message, tool_schema, rounds);
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;
        tracing::debug!(rounds = rounds.len(), "model replied: {}", output);
        Ok(parse_llm_output(&output))
    }

    fn build_messages(
        &self,
        history: &ConversationHistory,
        message: &str,
        tool_schema: &str,
        rounds: &[ToolRound],
    ) -> Vec<ChatMessage> {
        let system = format!(
            "{}\n\n## Available tools\n{}\n\n## Tool call format\n\
             To use a tool, reply with ONLY one JSON object: {{\"tool\": \"<name>\", \"args\": {{...}}}}.\n\
             Otherwise reply to the customer in plain text.",
            self.system_prompt, tool_schema
        );
        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history.window(self.history_limit));
        messages.push(ChatMessage::user(message));
        for round in rounds {
            let call_json = serde_json::to_string(&round.call).unwrap_or_default();
            messages.push(ChatMessage::model(call_json));
            messages.push(ChatMessage::user(format!(
                "Observation from {}: {}",
                round.call.name, round.result
            )));
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;
    use serde_json::json;

    #[test]
    fn test_parse_plain_text() {
        let reply = parse_llm_output("  Hello there!  ");
        assert_eq!(reply.text.as_deref(), Some("Hello there!"));
        assert!(reply.tool_call.is_none());
    }

    #[test]
    fn test_parse_tool_call() {
        let reply = parse_llm_output(r#"{"tool": "recommendDish", "args": {"query": "spicy"}}"#);
        let call = reply.tool_call.unwrap();
        assert_eq!(call.name, "recommendDish");
        assert_eq!(call.args, json!({"query": "spicy"}));
        assert!(reply.text.is_none());
    }

    #[test]
    fn test_parse_fenced_tool_call_without_args() {
        let reply = parse_llm_output("Sure.\n```json\n{\"tool\": \"getMenu\"}\n```");
        let call = reply.tool_call.unwrap();
        assert_eq!(call.name, "getMenu");
        assert_eq!(call.args, json!({}));
    }

    #[test]
    fn test_braces_in_prose_stay_text() {
        let reply = parse_llm_output("Our set {burger + drink} is great");
        assert!(reply.tool_call.is_none());
        assert_eq!(reply.text.as_deref(), Some("Our set {burger + drink} is great"));
    }

    #[test]
    fn test_quoted_menu_item_stays_text() {
        let text = r#"Our pick is {"name": "Nebula Burger", "price": 18.99}"#;
        let reply = parse_llm_output(text);
        assert!(reply.tool_call.is_none());
        assert_eq!(reply.text.as_deref(), Some(text));
    }

    #[test]
    fn test_extra_keys_are_not_a_tool_call() {
        let reply = parse_llm_output(r#"{"tool": "getMenu", "args": {}, "note": "x"}"#);
        assert!(reply.tool_call.is_none());
        assert!(reply.text.is_some());
    }

    #[test]
    fn test_empty_output_has_no_text() {
        let reply = parse_llm_output("   ");
        assert_eq!(reply, ModelReply::default());
    }

    #[tokio::test]
    async fn test_send_tool_result_replays_round() {
        let mock = Arc::new(MockLlmClient::scripted(["Here is the menu."]));
        let planner = Planner::new(mock.clone(), "sys");
        let mut history = ConversationHistory::new();
        history.push(ChatMessage::model("Welcome"));
        let round = ToolRound {
            call: ToolCall::new("getMenu", json!({})),
            result: json!([{"id": "m1"}]),
        };
        let reply = planner
            .send_tool_result(&history, "show menu", "[]", &[round])
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some("Here is the menu."));

        let sent = &mock.requests()[0];
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.contains("## Available tools"));
        assert_eq!(sent[2].content, "show menu");
        assert!(sent[3].content.contains("\"tool\":\"getMenu\""));
        assert!(sent[4].content.starts_with("Observation from getMenu:"));
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_agent_error() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_failure("503");
        let planner = Planner::new(mock, "sys");
        let err = planner
            .send(&ConversationHistory::new(), "hi", "[]")
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::LlmError("503".into()));
    }
}
