//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use mock::{MockLlmClient, MockReply};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

use crate::config::LlmSection;

/// 根据配置与环境变量选择 LLM 后端；缺少 API Key 时返回 None（模型未配置，编排器只返回提示）
///
/// - provider = "mock"：MockLlmClient（本地演示）
/// - provider = "deepseek"：需要 `DEEPSEEK_API_KEY`
/// - 其它：OpenAI 兼容端点，需要 `OPENAI_API_KEY`（或通用的 `API_KEY`）
pub fn create_llm_from_config(cfg: &LlmSection) -> Option<Arc<dyn LlmClient>> {
    let provider = cfg.provider.to_lowercase();
    match provider.as_str() {
        "mock" => {
            tracing::warn!("Using Mock LLM");
            Some(Arc::new(MockLlmClient::new()))
        }
        "deepseek" => {
            let key = std::env::var("DEEPSEEK_API_KEY").ok()?;
            // 默认 model 是 OpenAI 的，非 deepseek-* 时交给 create_deepseek_client 选择
            let model = cfg.model.starts_with("deepseek").then_some(cfg.model.as_str());
            let client = create_deepseek_client(model, &key);
            tracing::info!("Using DeepSeek LLM");
            Some(Arc::new(client))
        }
        _ => {
            let Some(key) = std::env::var("OPENAI_API_KEY")
                .ok()
                .or_else(|| std::env::var("API_KEY").ok())
            else {
                tracing::warn!("No API key set, language model is not configured");
                return None;
            };
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.model);
            Some(Arc::new(OpenAiClient::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                &key,
            )))
        }
    }
}
