//! The message-triage pipeline.
//!
//! This module holds the only real branching logic in the system:
//! - The per-user spam guard.
//! - The ordered FAQ matcher.
//! - The orchestrator that walks a message through spam check, FAQ lookup,
//!   the knowledge responder, and ticket routing.

pub mod faq;
pub mod orchestrator;
pub mod spam;
