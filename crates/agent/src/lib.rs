//! Conversation runtime for the TalentScout intake assistant.
//!
//! - `conversation` turns raw user text into flow events and record updates
//! - `questions` builds the per-session question set from the taxonomy and an
//!   optional LLM
//! - `llm` is the text-completion boundary and its HTTP providers
//! - `prompts` holds every user-facing message
//! - `runtime` ties them to the flow engine: `IntakeRuntime::advance`
//!
//! The LLM only ever proposes question wording. Phase changes, validation,
//! and persistence are decided by the flow engine and validators.

pub mod conversation;
pub mod llm;
pub mod prompts;
pub mod questions;
pub mod runtime;

pub use llm::{build_llm_client, DisabledLlmClient, HttpLlmClient, LlmClient, LlmError};
pub use questions::{GenerationReport, QuestionGenerator, QuestionPolicy};
pub use runtime::{IntakeRuntime, Turn};
