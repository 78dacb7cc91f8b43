//! Ticket store client and the in-memory implementation.

use std::{
    collections::HashMap,
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use crate::base::types::{Messenger, Res, Ticket, TicketStatus, Void};
use anyhow::anyhow;

// Traits.

/// Generic ticket store trait that implementations must satisfy.
#[async_trait]
pub trait GenericTicketStore {
    /// Look up the open ticket for a user on a messenger, if any.
    async fn open_ticket_for(&self, user_id: &str, messenger: Messenger) -> Res<Option<Ticket>>;
    /// Create a new open ticket for a user on a messenger.
    async fn create_ticket(&self, user_id: &str, messenger: Messenger) -> Res<Ticket>;
    /// Append a message to a ticket's history.
    async fn record_message(&self, ticket_id: u64, text: &str) -> Void;
    /// Flag a ticket as having received an automated reply.
    async fn mark_auto_replied(&self, ticket_id: u64) -> Void;
}

// Structs.

/// Ticket store client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TicketClient {
    inner: Arc<dyn GenericTicketStore + Send + Sync + 'static>,
}

impl Deref for TicketClient {
    type Target = dyn GenericTicketStore + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TicketClient {
    pub fn new(inner: Arc<dyn GenericTicketStore + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Creates a client backed by the in-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryTicketStore::new()))
    }
}

// Specific implementations.

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    tickets: HashMap<u64, Ticket>,
    messages: HashMap<u64, Vec<String>>,
}

/// In-memory ticket store.
///
/// Tickets live for the lifetime of the process; nothing survives a restart.
pub struct MemoryTicketStore {
    state: Mutex<MemoryState>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Messages recorded against a ticket, oldest first.
    pub fn recorded_messages(&self, ticket_id: u64) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.messages.get(&ticket_id).cloned().unwrap_or_default()
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenericTicketStore for MemoryTicketStore {
    async fn open_ticket_for(&self, user_id: &str, messenger: Messenger) -> Res<Option<Ticket>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let ticket = state
            .tickets
            .values()
            .find(|t| t.user_id == user_id && t.messenger == messenger && t.status == TicketStatus::Open)
            .cloned();

        Ok(ticket)
    }

    #[instrument(skip(self))]
    async fn create_ticket(&self, user_id: &str, messenger: Messenger) -> Res<Ticket> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let id = state.next_id;
        state.next_id += 1;

        let ticket = Ticket {
            id,
            user_id: user_id.to_string(),
            messenger,
            status: TicketStatus::Open,
            auto_replied: false,
            created_at: Utc::now(),
        };

        state.tickets.insert(id, ticket.clone());

        info!("Created ticket #{id} for user `{user_id}`.");

        Ok(ticket)
    }

    async fn record_message(&self, ticket_id: u64, text: &str) -> Void {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if !state.tickets.contains_key(&ticket_id) {
            return Err(anyhow!("Cannot record a message against unknown ticket #{ticket_id}."));
        }

        state.messages.entry(ticket_id).or_default().push(text.to_string());

        Ok(())
    }

    async fn mark_auto_replied(&self, ticket_id: u64) -> Void {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| anyhow!("Cannot flag unknown ticket #{ticket_id}."))?;

        ticket.auto_replied = true;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_lookup_returns_the_open_ticket() {
        let store = MemoryTicketStore::new();

        let created = store.create_ticket("u1", Messenger::Telegram).await.unwrap();
        let found = store.open_ticket_for("u1", Messenger::Telegram).await.unwrap().unwrap();

        assert_eq!(created.id, found.id);
        assert_eq!(found.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_the_messenger() {
        let store = MemoryTicketStore::new();

        store.create_ticket("u1", Messenger::Telegram).await.unwrap();

        assert!(store.open_ticket_for("u1", Messenger::Signal).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recording_against_unknown_ticket_fails_loudly() {
        let store = MemoryTicketStore::new();

        assert!(store.record_message(42, "hello").await.is_err());
    }

    #[tokio::test]
    async fn mark_auto_replied_flags_the_ticket() {
        let store = MemoryTicketStore::new();

        let ticket = store.create_ticket("u1", Messenger::Web).await.unwrap();
        store.mark_auto_replied(ticket.id).await.unwrap();

        let found = store.open_ticket_for("u1", Messenger::Web).await.unwrap().unwrap();
        assert!(found.auto_replied);
    }
}
