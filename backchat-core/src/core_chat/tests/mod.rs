//! Scenario tests for the conversation sync engine

mod recent_conversations;
mod support;
