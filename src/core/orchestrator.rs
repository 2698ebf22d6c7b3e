//! 对话编排器：单会话的回合状态机
//!
//! 一个回合：追加用户消息 → 模型首次回复 →（工具分发 → 回传结果 → 模型续写）× 至多 max_tool_calls 次 → 最终文本。
//! 阶段通过 watch 通道发布；同一会话同一时刻只允许一个回合（in-flight 标志），并发请求直接拒绝，不排队。
//! 模型调用是回合内仅有的挂起点，编排器本身不设超时。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

use crate::core::{AgentError, TurnPhase, TurnReply};
use crate::memory::{ChatMessage, ConversationHistory};
use crate::react::{ModelReply, Planner, ToolRound};
use crate::store::{log, LogStatus, RestaurantStore};
use crate::tools::ToolRegistry;

/// 未配置模型时的固定提示
pub const API_KEY_ADVISORY: &str =
    "⚠️ API Key missing. Please set OPENAI_API_KEY (or API_KEY) to use the AI features.";
/// 模型调用失败时展示给用户的提示
pub const CONNECTION_ERROR: &str = "An error occurred connecting to the AI Agents.";
/// 模型没有给出可用文本时的兜底回复
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that.";

/// 回合结束时 in-flight 标志复位、阶段回到 Idle（含 future 被丢弃的情况）
struct TurnGuard<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a watch::Sender<TurnPhase>,
}

impl<'a> TurnGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool, phase: &'a watch::Sender<TurnPhase>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { in_flight, phase })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(TurnPhase::Idle);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// 模型协作完成后的回合结果（尚未写入历史）
struct TurnOutcome {
    text: String,
    rounds: Vec<ToolRound>,
}

pub struct Orchestrator {
    store: RestaurantStore,
    tools: ToolRegistry,
    /// None 表示模型未配置（无 API Key）
    planner: Option<Planner>,
    history: Mutex<ConversationHistory>,
    in_flight: AtomicBool,
    phase_tx: watch::Sender<TurnPhase>,
    max_tool_calls: usize,
}

impl Orchestrator {
    pub fn new(
        store: RestaurantStore,
        tools: ToolRegistry,
        planner: Option<Planner>,
        max_tool_calls: usize,
    ) -> Self {
        let (phase_tx, _) = watch::channel(TurnPhase::Idle);
        Self {
            store,
            tools,
            planner,
            history: Mutex::new(ConversationHistory::new()),
            in_flight: AtomicBool::new(false),
            phase_tx,
            max_tool_calls,
        }
    }

    /// 以开场白作为第一条 model 消息
    pub fn with_greeting(self, greeting: &str) -> Self {
        if !greeting.trim().is_empty() {
            self.lock_history().push(ChatMessage::model(greeting));
        }
        self
    }

    pub fn is_model_configured(&self) -> bool {
        self.planner.is_some()
    }

    /// 累计 token 用量；模型未配置时为 None
    pub fn token_usage(&self) -> Option<(u64, u64, u64)> {
        self.planner.as_ref().map(Planner::token_usage)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// 完整历史快照（含 system 提示）
    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock_history().messages().to_vec()
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase_tx.borrow()
    }

    /// 订阅回合阶段变化（UI 显示「Agents coordinating...」）
    pub fn subscribe_phase(&self) -> watch::Receiver<TurnPhase> {
        self.phase_tx.subscribe()
    }

    /// 处理一次用户输入
    ///
    /// - 空输入：`EmptyInput`
    /// - 已有回合进行中：`TurnInFlight`
    /// - 未配置模型：写入 system 提示并返回 advisory，不占用回合、不触碰 Store
    /// - 模型调用失败：记录 Error 日志，写入 system 提示并返回 failed
    pub async fn handle_turn(&self, input: &str) -> Result<TurnReply, AgentError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::EmptyInput);
        }
        if self.in_flight.load(Ordering::Acquire) {
            return Err(AgentError::TurnInFlight);
        }
        let Some(planner) = &self.planner else {
            tracing::warn!("turn rejected: {}", AgentError::CollaboratorUnavailable);
            self.lock_history().push(ChatMessage::system(API_KEY_ADVISORY));
            return Ok(TurnReply::advisory(API_KEY_ADVISORY));
        };
        let _guard =
            TurnGuard::acquire(&self.in_flight, &self.phase_tx).ok_or(AgentError::TurnInFlight)?;

        // 模型看到的历史不含本条用户消息（由 Planner 单独追加）
        let prior = {
            let mut history = self.lock_history();
            let prior = history.clone();
            history.push(ChatMessage::user(input));
            prior
        };
        self.store.add_log(
            log::ORCHESTRATOR,
            "Processing",
            "Analyzing user intent...",
            LogStatus::Thinking,
        );
        tracing::info!(input_len = input.len(), "turn started");

        match self.run_model(planner, &prior, input).await {
            Ok(outcome) => Ok(self.finish_turn(outcome)),
            Err(e) => {
                tracing::error!("turn failed: {}", e);
                self.store
                    .add_log(log::ORCHESTRATOR, "Error", e.to_string(), LogStatus::Failed);
                self.lock_history().push(ChatMessage::system(CONNECTION_ERROR));
                Ok(TurnReply::failed(CONNECTION_ERROR))
            }
        }
    }

    async fn run_model(
        &self,
        planner: &Planner,
        prior: &ConversationHistory,
        input: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let schema = self.tools.to_schema_json();
        self.set_phase(TurnPhase::AwaitingModel);
        let mut reply: ModelReply = planner.send(prior, input, &schema).await?;
        let mut rounds: Vec<ToolRound> = Vec::new();

        while let Some(call) = reply.tool_call.take() {
            if rounds.len() >= self.max_tool_calls {
                tracing::warn!(
                    tool = %call.name,
                    limit = self.max_tool_calls,
                    "tool call limit reached, ending turn"
                );
                return Ok(TurnOutcome {
                    text: FALLBACK_REPLY.to_string(),
                    rounds,
                });
            }

            self.set_phase(TurnPhase::ToolRequested);
            let outcome = self.tools.dispatch(&call.name, call.args.clone()).await;
            match outcome.error_message() {
                None => self.store.add_log(
                    log::ORCHESTRATOR,
                    "Tool Usage",
                    format!("Executed tool: {}", call.name),
                    LogStatus::Success,
                ),
                Some(err) => self.store.add_log(
                    log::ORCHESTRATOR,
                    "Error",
                    format!("Tool {} failed: {}", call.name, err),
                    LogStatus::Failed,
                ),
            }
            rounds.push(ToolRound {
                call,
                result: outcome.payload,
            });

            self.set_phase(TurnPhase::AwaitingModelResumption);
            reply = planner
                .send_tool_result(prior, input, &schema, &rounds)
                .await?;
        }

        Ok(TurnOutcome {
            text: reply.text.unwrap_or_else(|| FALLBACK_REPLY.to_string()),
            rounds,
        })
    }

    /// 写入 model 消息（标注最后一次工具调用）并组装返回值
    fn finish_turn(&self, outcome: TurnOutcome) -> TurnReply {
        let last = outcome.rounds.into_iter().last();
        let mut message = ChatMessage::model(outcome.text.clone());
        let mut reply = TurnReply::completed(outcome.text);
        if let Some(ToolRound { call, result }) = last {
            reply.tool_called = Some(call.name.clone());
            reply.tool_result = Some(result);
            message = message.with_tool_call(call);
        }
        self.lock_history().push(message);
        tracing::info!(tool = ?reply.tool_called, "turn completed");
        reply
    }

    fn set_phase(&self, phase: TurnPhase) {
        self.phase_tx.send_replace(phase);
    }

    fn lock_history(&self) -> MutexGuard<'_, ConversationHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 工具结果中的错误文本（`{"error": ...}`）
pub fn tool_error_of(result: &Value) -> Option<&str> {
    result.get("error").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;
    use crate::tools::restaurant_registry;

    fn orchestrator(mock: Arc<MockLlmClient>, max_tool_calls: usize) -> (Orchestrator, RestaurantStore) {
        let store = RestaurantStore::default();
        let planner = Planner::new(mock, "sys");
        let orch = Orchestrator::new(
            store.clone(),
            restaurant_registry(&store),
            Some(planner),
            max_tool_calls,
        );
        (orch, store)
    }

    #[tokio::test]
    async fn test_plain_reply_has_no_tool() {
        let mock = Arc::new(MockLlmClient::scripted(["Hello! How can I help?"]));
        let (orch, store) = orchestrator(mock.clone(), 1);
        let reply = orch.handle_turn("hi").await.unwrap();
        assert_eq!(reply.text, "Hello! How can I help?");
        assert!(reply.tool_called.is_none());
        assert_eq!(mock.request_count(), 1);
        assert_eq!(store.logs()[0].action, "Processing");
        assert_eq!(orch.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "getMenu", "args": {}}"#,
            "We have seven dishes today.",
        ]));
        let (orch, store) = orchestrator(mock.clone(), 1);
        let reply = orch.handle_turn("what's on the menu?").await.unwrap();
        assert_eq!(reply.text, "We have seven dishes today.");
        assert_eq!(reply.tool_called.as_deref(), Some("getMenu"));
        assert_eq!(reply.tool_result.unwrap().as_array().unwrap().len(), 7);
        assert_eq!(mock.request_count(), 2);

        let actions: Vec<String> = store.logs().into_iter().map(|l| l.action).collect();
        assert!(actions.contains(&"Tool Usage".to_string()));
        assert!(actions.contains(&"Fetch".to_string()));

        let history = orch.history();
        let last = history.last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.tool_call.as_ref().unwrap().name, "getMenu");
    }

    #[tokio::test]
    async fn test_tool_error_is_fed_back_to_model() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "checkOrderStatus", "args": {"orderId": "NOPE1"}}"#,
            "I couldn't find that order.",
        ]));
        let (orch, _) = orchestrator(mock.clone(), 1);
        let reply = orch.handle_turn("where is NOPE1?").await.unwrap();
        assert_eq!(reply.text, "I couldn't find that order.");
        let result = reply.tool_result.unwrap();
        assert_eq!(tool_error_of(&result), Some("Order not found"));
        let second = &mock.requests()[1];
        assert!(second.last().unwrap().content.contains("Order not found"));
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_logged_as_error() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "launchRocket", "args": {}}"#,
            "Sorry, I can't do that.",
        ]));
        let (orch, store) = orchestrator(mock, 1);
        let reply = orch.handle_turn("launch a rocket").await.unwrap();
        assert_eq!(reply.tool_called.as_deref(), Some("launchRocket"));

        let logs = store.logs();
        let failed = logs
            .iter()
            .find(|l| l.agent_name == log::ORCHESTRATOR && l.status == LogStatus::Failed)
            .unwrap();
        assert_eq!(failed.action, "Error");
        assert!(failed.details.contains("Unknown tool: launchRocket"));
        assert!(!logs.iter().any(|l| l.action == "Tool Usage"));
    }

    #[tokio::test]
    async fn test_quoted_json_reply_is_final_text() {
        let text = r#"Sure! Our top pick is {"name": "Nebula Burger", "price": 18.99}. Enjoy!"#;
        let mock = Arc::new(MockLlmClient::scripted([text]));
        let (orch, _) = orchestrator(mock.clone(), 1);
        let reply = orch.handle_turn("what do you recommend?").await.unwrap();
        assert_eq!(reply.text, text);
        assert!(reply.tool_called.is_none());
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_second_tool_request_hits_limit() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "getMenu"}"#,
            r#"{"tool": "recommendDish", "args": {"query": "spicy"}}"#,
        ]));
        let (orch, _) = orchestrator(mock.clone(), 1);
        let reply = orch.handle_turn("anything spicy?").await.unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
        assert_eq!(reply.tool_called.as_deref(), Some("getMenu"));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_chaining_when_limit_allows() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "getMenu"}"#,
            r#"{"tool": "recommendDish", "args": {"query": "spicy"}}"#,
            "Try the Cyber Spicy Noodles.",
        ]));
        let (orch, _) = orchestrator(mock.clone(), 2);
        let reply = orch.handle_turn("anything spicy?").await.unwrap();
        assert_eq!(reply.text, "Try the Cyber Spicy Noodles.");
        assert_eq!(reply.tool_called.as_deref(), Some("recommendDish"));
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_becomes_failed_reply() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_failure("connection refused");
        let (orch, store) = orchestrator(mock, 1);
        let reply = orch.handle_turn("hi").await.unwrap();
        assert_eq!(reply.status, crate::core::TurnStatus::Failed);
        assert_eq!(reply.text, CONNECTION_ERROR);
        let latest = &store.logs()[0];
        assert_eq!(latest.action, "Error");
        assert_eq!(latest.status, LogStatus::Failed);
        let history = orch.history();
        assert_eq!(history.last().unwrap().role, Role::System);
        assert_eq!(orch.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_no_model_returns_advisory() {
        let store = RestaurantStore::default();
        let logs_before = store.logs().len();
        let orch = Orchestrator::new(store.clone(), restaurant_registry(&store), None, 1)
            .with_greeting("Welcome");
        let reply = orch.handle_turn("hi").await.unwrap();
        assert_eq!(reply.status, crate::core::TurnStatus::Advisory);
        assert_eq!(reply.text, API_KEY_ADVISORY);
        assert_eq!(store.logs().len(), logs_before);
        let history = orch.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::System);
    }

    #[tokio::test]
    async fn test_blank_input_rejected() {
        let (orch, _) = orchestrator(Arc::new(MockLlmClient::new()), 1);
        assert_eq!(orch.handle_turn("   ").await.unwrap_err(), AgentError::EmptyInput);
        assert!(orch.history().is_empty());
    }

    #[test]
    fn test_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let (tx, _) = watch::channel(TurnPhase::Idle);
        let first = TurnGuard::acquire(&flag, &tx);
        assert!(first.is_some());
        assert!(TurnGuard::acquire(&flag, &tx).is_none());
        drop(first);
        assert!(TurnGuard::acquire(&flag, &tx).is_some());
    }
}
