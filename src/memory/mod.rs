//! 记忆层：单会话对话历史

pub mod conversation;

pub use conversation::{ChatMessage, ConversationHistory, Role};
