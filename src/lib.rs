//! Library root for `support-relay`.
//!
//! Support-relay is a support-ticket bot bridging end users on a chat
//! messenger to a staff channel.  Each incoming message is triaged:
//! - Blocked outright when the user trips the spam guard
//! - Auto-answered from a static FAQ table
//! - Auto-answered by an LLM grounded on a fixed knowledge base
//! - Otherwise forwarded to staff as a new or existing support ticket
//!
//! The bot integrates with OpenAI for grounded answers; messenger delivery
//! and ticket storage sit behind extensible traits that allow for different
//! implementations of each service.

pub mod base;
pub mod prelude;
pub mod runtime;
pub mod service;
pub mod triage;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the support-relay runtime:
/// - Creates the runtime context with the spam guard, FAQ matcher, LLM,
///   ticket store, and chat clients
/// - Starts the inbound message listener
pub async fn start(config: Config) -> Void {
    info!("Starting support-relay ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
