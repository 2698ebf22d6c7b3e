//! 编排器构建器：统一装配 Store、工具注册表、Planner
//!
//! CLI 与测试共用同一套装配逻辑，保证工具集与提示词一致。

use std::sync::Arc;

use crate::config::{load_system_prompt, AppConfig};
use crate::core::Orchestrator;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::react::Planner;
use crate::store::RestaurantStore;
use crate::tools::{restaurant_registry, ToolRegistry};

/// LLM 来源：按配置创建，或由调用方直接注入（None 表示模型未配置）
enum LlmSource {
    FromConfig,
    Injected(Option<Arc<dyn LlmClient>>),
}

pub struct OrchestratorBuilder {
    config: AppConfig,
    system_prompt: Option<String>,
    llm: LlmSource,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            system_prompt: None,
            llm: LlmSource::FromConfig,
        }
    }

    /// 设置系统提示词；未设置时从 config/prompts/system.txt 读取
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// 直接注入 LLM（测试用 Mock，或传 None 模拟未配置）
    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmClient>>) -> Self {
        self.llm = LlmSource::Injected(llm);
        self
    }

    pub fn build_llm(&self) -> Option<Arc<dyn LlmClient>> {
        match &self.llm {
            LlmSource::FromConfig => create_llm_from_config(&self.config.llm),
            LlmSource::Injected(llm) => llm.clone(),
        }
    }

    pub fn build_tool_registry(&self, store: &RestaurantStore) -> ToolRegistry {
        restaurant_registry(store)
    }

    pub fn build_planner(&self) -> Option<Planner> {
        let llm = self.build_llm()?;
        let prompt = self
            .system_prompt
            .clone()
            .unwrap_or_else(load_system_prompt);
        Some(Planner::new(llm, prompt).with_history_limit(self.config.app.max_history_messages))
    }

    /// 装配编排器：工具与 Store 共享同一份状态，开场白写入历史
    pub fn build(&self, store: &RestaurantStore) -> Orchestrator {
        let planner = self.build_planner();
        if planner.is_none() {
            tracing::warn!("language model not configured, chat will only return an advisory");
        }
        Orchestrator::new(
            store.clone(),
            self.build_tool_registry(store),
            planner,
            self.config.agent.max_tool_calls_per_turn,
        )
        .with_greeting(&self.config.app.greeting)
    }
}
