//! Market Companion
//!
//! A tool-using financial advisor:
//! - A language model decides which market-data tool to call
//! - Tools read quotes, news, financials and bars from Polygon.io
//! - A small state machine loops until the model answers
//! - A web form (and CLI) runs one session per question
//!
//! LOOP:
//! INPUT → DECIDE → EXECUTE → DECIDE → ... → ANSWER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod openai;
pub mod reasoning;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::{Agent, LoopState};
pub use config::AdvisorConfig;
pub use models::*;
