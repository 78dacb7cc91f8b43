//! Service integrations for external collaborators.
//!
//! This module contains implementations for the services used by the relay:
//! - Chat delivery (console for local runs; real messengers plug in behind the trait)
//! - Ticket storage (in-memory)
//! - LLM knowledge responder (OpenAI)
//!
//! Each service module defines both a generic trait and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod llm;
pub mod tickets;
