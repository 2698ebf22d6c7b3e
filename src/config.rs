//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `NEXUS__*` 覆盖（双下划线表示嵌套，如 `NEXUS__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub agent: AgentSection,
}

/// [app] 段：应用名、开场白、发送给模型的历史条数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话开场白（作为第一条 model 消息写入历史）；为空则不写
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// 每次只把最近 N 条历史发给模型；未设置则全部发送
    pub max_history_messages: Option<usize>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            greeting: default_greeting(),
            max_history_messages: None,
        }
    }
}

fn default_greeting() -> String {
    "Welcome to Nexus. I am your Agentic Orchestrator. How can I assist you today? You can ask for recommendations or place an order.".to_string()
}

/// [llm] 段：后端选择（openai / deepseek / mock）；API Key 只从环境变量读取
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [store] 段：日志保留、后厨通知延时、工作流校验
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_kitchen_notify_delay_ms")]
    pub kitchen_notify_delay_ms: u64,
    /// 为 true 时 update_order_status 只接受工作流合法边
    #[serde(default)]
    pub enforce_workflow: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            kitchen_notify_delay_ms: default_kitchen_notify_delay_ms(),
            enforce_workflow: false,
        }
    }
}

fn default_log_capacity() -> usize {
    crate::store::log::DEFAULT_LOG_CAPACITY
}

fn default_kitchen_notify_delay_ms() -> u64 {
    500
}

/// [agent] 段：单回合内工具调用次数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls_per_turn: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_tool_calls_per_turn: default_max_tool_calls(),
        }
    }
}

fn default_max_tool_calls() -> usize {
    1
}

/// 从 config 目录加载配置，环境变量 NEXUS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 NEXUS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("NEXUS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 读取 system prompt：config/prompts/system.txt，不存在时用内置默认
pub fn load_system_prompt() -> String {
    ["config/prompts/system.txt", "../config/prompts/system.txt"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .unwrap_or_else(|| crate::react::planner::DEFAULT_SYSTEM_PROMPT.to_string())
}
