//! 编排器集成测试：回合状态机、in-flight 保护、未配置模型

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nexus::config::AppConfig;
use nexus::core::{AgentError, TurnPhase, TurnStatus, API_KEY_ADVISORY};
use nexus::llm::{LlmClient, MockLlmClient};
use nexus::memory::{ChatMessage, Role};
use nexus::create_session_with_llm;

/// 固定延时后回复，用于制造并发回合
struct SlowLlm {
    delay: Duration,
}

#[async_trait]
impl LlmClient for SlowLlm {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, String> {
        tokio::time::sleep(self.delay).await;
        Ok("done".to_string())
    }
}

#[tokio::test]
async fn test_plain_and_tool_turns() {
    let mock = Arc::new(MockLlmClient::scripted([
        "Hi! I'm Nexus.",
        r#"{"tool": "getMenu", "args": {}}"#,
        "Here is our menu: Nebula Burger, ...",
    ]));
    let session = create_session_with_llm(&AppConfig::default(), Some(mock.clone()));

    let first = session.chat("hello").await.unwrap();
    assert_eq!(first.text, "Hi! I'm Nexus.");
    assert!(first.tool_called.is_none());

    let second = session.chat("show me the menu").await.unwrap();
    assert_eq!(second.status, TurnStatus::Completed);
    assert_eq!(second.tool_called.as_deref(), Some("getMenu"));
    assert!(second.text.starts_with("Here is our menu"));

    // 第二回合发送的历史包含开场白与第一回合
    let sent = &mock.requests()[1];
    assert_eq!(sent[1].content, AppConfig::default().app.greeting);
    assert_eq!(sent[2].content, "hello");
    assert_eq!(sent[3].content, "Hi! I'm Nexus.");
    assert_eq!(sent[4].content, "show me the menu");

    let history = session.orchestrator.history();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::Model, Role::User, Role::Model, Role::User, Role::Model]
    );
}

#[tokio::test]
async fn test_concurrent_turn_is_rejected() {
    let llm = Arc::new(SlowLlm {
        delay: Duration::from_millis(100),
    });
    let session = create_session_with_llm(&AppConfig::default(), Some(llm));

    let (a, b) = tokio::join!(session.chat("first"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.chat("second").await
    });
    assert_eq!(a.unwrap().text, "done");
    assert_eq!(b.unwrap_err(), AgentError::TurnInFlight);

    // 回合结束后可以继续
    assert!(session.chat("third").await.is_ok());
}

#[tokio::test]
async fn test_phase_is_observable() {
    let llm = Arc::new(SlowLlm {
        delay: Duration::from_millis(50),
    });
    let session = create_session_with_llm(&AppConfig::default(), Some(llm));
    let mut rx = session.orchestrator.subscribe_phase();
    assert_eq!(*rx.borrow(), TurnPhase::Idle);

    let (reply, seen) = tokio::join!(session.chat("hi"), async {
        rx.changed().await.unwrap();
        *rx.borrow_and_update()
    });
    assert!(reply.is_ok());
    assert_eq!(seen, TurnPhase::AwaitingModel);
    assert_eq!(session.orchestrator.phase(), TurnPhase::Idle);
}

#[tokio::test]
async fn test_unconfigured_model_only_advises() {
    let session = create_session_with_llm(&AppConfig::default(), None);
    let logs_before = session.store.logs();
    let reply = session.chat("I'd like a burger").await.unwrap();
    assert_eq!(reply.status, TurnStatus::Advisory);
    assert_eq!(reply.text, API_KEY_ADVISORY);
    assert_eq!(session.store.logs(), logs_before);
    assert!(session.store.orders().is_empty());
}

#[tokio::test]
async fn test_history_window_limits_model_context() {
    let mut cfg = AppConfig::default();
    cfg.app.max_history_messages = Some(2);
    let mock = Arc::new(MockLlmClient::scripted(["one", "two", "three"]));
    let session = create_session_with_llm(&cfg, Some(mock.clone()));
    for input in ["a", "b", "c"] {
        session.chat(input).await.unwrap();
    }
    let last = mock.requests().pop().unwrap();
    // system + 最近 2 条历史 + 新消息
    assert_eq!(last.len(), 4);
    assert_eq!(last[1].content, "b");
    assert_eq!(last[2].content, "two");
    assert_eq!(session.orchestrator.history().len(), 7);
}
