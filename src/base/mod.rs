//! Core components, types, and utilities for the support relay.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The system prompt and knowledge-base assembly for LLM interactions.
//! - Markup escaping for user-controlled text.
//! - Common types and result handling.

pub mod config;
pub mod markup;
pub mod prompts;
pub mod types;
