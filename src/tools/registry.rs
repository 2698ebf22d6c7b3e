//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! dispatch 是失败边界：未知工具、参数错误、存储失败、工具 panic 一律转为 `{"error": "..."}`，
//! 保证模型总能收到结果；每次调用输出结构化审计日志（JSON）。

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::core::ToolError;
use crate::tools::schema::no_args_schema;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        no_args_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// 一次分发的结果：payload 为工具返回值，或失败时的 `{"error": message}`
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub ok: bool,
    pub payload: Value,
}

impl ToolOutcome {
    fn from_result(tool: &str, result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(payload) => Self {
                tool: tool.to_string(),
                ok: true,
                payload,
            },
            Err(e) => Self {
                tool: tool.to_string(),
                ok: false,
                payload: serde_json::json!({ "error": e.to_string() }),
            },
        }
    }

    /// 失败时的错误文本
    pub fn error_message(&self) -> Option<&str> {
        if self.ok {
            None
        } else {
            self.payload.get("error").and_then(Value::as_str)
        }
    }
}

/// 工具注册表：按名称有序存储 Arc<dyn Tool>（保证 schema 输出稳定）
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 工具清单 JSON（name / description / parameters），拼入 system prompt
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }

    /// 分发工具调用；永不返回 Err，也不向上传播 panic
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolOutcome {
        let start = Instant::now();
        let args_preview = args_preview(&args);

        let result = match self.get(name) {
            None => Err(ToolError::UnknownTool(name.to_string())),
            Some(tool) => AssertUnwindSafe(tool.execute(args))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ToolError::Unexpected(panic_message(panic.as_ref())))),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ToolError::UnknownTool(_)) => "unknown_tool",
            Err(ToolError::InvalidArguments(_)) => "invalid_args",
            Err(ToolError::Unexpected(_)) => "unexpected",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        if result.is_ok() {
            tracing::info!(audit = %audit, "tool");
        } else {
            tracing::warn!(audit = %audit, "tool");
        }

        ToolOutcome::from_result(name, result)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct PanickyTool;

    #[async_trait]
    impl Tool for PanickyTool {
        fn name(&self) -> &str {
            "panicky"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            panic!("kaboom");
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo args"
        }

        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_structured() {
        let registry = ToolRegistry::new();
        let out = registry.dispatch("launchRocket", json!({})).await;
        assert!(!out.ok);
        assert_eq!(out.payload, json!({"error": "Unknown tool: launchRocket"}));
    }

    #[tokio::test]
    async fn test_panic_is_caught_at_boundary() {
        let mut registry = ToolRegistry::new();
        registry.register(PanickyTool);
        let out = registry.dispatch("panicky", json!({})).await;
        assert!(!out.ok);
        assert_eq!(out.error_message(), Some("Unexpected failure: kaboom"));
    }

    #[tokio::test]
    async fn test_success_passes_payload_through() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let out = registry.dispatch("echo", json!({"a": 1})).await;
        assert!(out.ok);
        assert_eq!(out.payload, json!({"a": 1}));
        assert_eq!(out.error_message(), None);
    }

    #[test]
    fn test_schema_lists_tools_in_name_order() {
        let mut registry = ToolRegistry::new();
        registry.register(PanickyTool);
        registry.register(EchoTool);
        assert_eq!(registry.tool_names(), vec!["echo", "panicky"]);
        let schema: Value = serde_json::from_str(&registry.to_schema_json()).unwrap();
        assert_eq!(schema[0]["name"], "echo");
        assert_eq!(schema[0]["parameters"]["type"], "object");
    }
}
