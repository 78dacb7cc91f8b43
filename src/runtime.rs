//! Runtime services and shared state for the support relay.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, llm::LlmClient, tickets::TicketClient},
    triage::{faq::FaqMatcher, spam::SpamGuard},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration and every injected service: the spam
/// guard, the FAQ matcher, the LLM client, the ticket store, and the chat
/// client.  It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The per-user spam guard.
    pub spam: SpamGuard,
    /// The FAQ matcher.
    pub faq: FaqMatcher,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The ticket store client.
    pub tickets: TicketClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the pipeline state.
        let spam = SpamGuard::new(&config);
        let faq = FaqMatcher::new(&config);

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the ticket store.
        let tickets = TicketClient::memory();

        // Initialize the chat client.
        let chat = ChatClient::console(&config, spam.clone(), faq.clone(), llm.clone(), tickets.clone());

        Ok(Self { config, spam, faq, llm, tickets, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
