//! 会话运行时
//!
//! Session 在会话开始时显式构建 RestaurantStore 与 Orchestrator，会话结束时 close()；
//! 界面层（CLI / 后厨看板 / 管理面板）都通过 Session 持有的同一个 Store 读写状态。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{load_config, AppConfig};
use crate::core::{AgentError, Orchestrator, OrchestratorBuilder, TurnReply};
use crate::llm::LlmClient;
use crate::store::RestaurantStore;

pub struct Session {
    pub store: RestaurantStore,
    pub orchestrator: Orchestrator,
}

impl Session {
    /// 对话一次；等价于 orchestrator.handle_turn
    pub async fn chat(&self, input: &str) -> Result<TurnReply, AgentError> {
        self.orchestrator.handle_turn(input).await
    }

    /// 结束会话：记录会话摘要后释放 Store 与编排器
    pub fn close(self) {
        let summary = self.store.sales_summary();
        let (_, _, total_tokens) = self.orchestrator.token_usage().unwrap_or_default();
        tracing::info!(
            orders = summary.order_count,
            messages = self.orchestrator.history().len(),
            total_tokens,
            "session closed"
        );
    }
}

/// 按配置创建会话（LLM 由配置与环境变量决定）
pub fn create_session(cfg: &AppConfig) -> Session {
    let store = RestaurantStore::from_config(&cfg.store);
    let orchestrator = OrchestratorBuilder::new(cfg.clone()).build(&store);
    Session { store, orchestrator }
}

/// 按配置创建会话，并注入指定 LLM（None 表示模型未配置）
pub fn create_session_with_llm(cfg: &AppConfig, llm: Option<Arc<dyn LlmClient>>) -> Session {
    let store = RestaurantStore::from_config(&cfg.store);
    let orchestrator = OrchestratorBuilder::new(cfg.clone())
        .with_llm(llm)
        .build(&store);
    Session { store, orchestrator }
}

/// 读取配置文件后创建会话；配置加载失败时回退默认配置
pub fn create_session_from_path(config_path: Option<PathBuf>) -> Session {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    create_session(&cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_session_shares_store_with_tools() {
        let mock = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "placeOrder", "args": {"customerName": "Ada", "items": [{"menuItemId": "m1", "quantity": 1}]}}"#,
            "Your order is in.",
        ]));
        let session = create_session_with_llm(&AppConfig::default(), Some(mock));
        let reply = session.chat("one nebula burger please, I'm Ada").await.unwrap();
        assert_eq!(reply.tool_called.as_deref(), Some("placeOrder"));
        assert_eq!(session.store.orders().len(), 1);
        assert_eq!(session.orchestrator.token_usage(), Some((0, 0, 0)));
        session.close();
    }

    #[test]
    fn test_token_usage_without_model() {
        let session = create_session_with_llm(&AppConfig::default(), None);
        assert_eq!(session.orchestrator.token_usage(), None);
        session.close();
    }
}
