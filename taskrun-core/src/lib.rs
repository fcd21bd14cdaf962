//! # taskrun core
//!
//! The building blocks of the agent loop.
//!
//! ## Core Concepts
//! - **Action**: the structured instruction decoded from a model response
//! - **Parser**: turns unreliable free text into exactly one validated Action
//! - **Policy**: cached approval rules gating command execution
//! - **Prompt**: the human side of approval, behind a trait seam
//! - **Provider**: trait-based LLM communication (OpenAI, Anthropic)

pub mod action;
pub mod extract;
pub mod parse;
pub mod policy;
pub mod prompt;
pub mod schema;
pub mod provider;

pub use action::{Action, ShellKind};
pub use parse::parse_action;
pub use policy::{Decision, PolicyStore, Rule};
pub use prompt::{ApprovalPrompt, PolicyGate, StdinPrompt};
pub use schema::{schema_summary, system_prompt};
pub use provider::{
    LlmProvider, ProviderConfig, ProviderType, ProviderError,
    ChatMessage, Role, CompletionRequest, CompletionResponse,
    FinishReason, Usage, UsageTracker,
    OpenAIProvider, AnthropicProvider,
};
