//! Wrapper around messenger delivery clients.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{ChannelKind, IncomingMessage, Messenger, Res, Void},
    },
    service::{llm::LlmClient, tickets::TicketClient},
    triage::{self, faq::FaqMatcher, spam::SpamGuard},
};

/// Handle of a delivered message, as reported by the messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(pub String);

// Traits.

/// Generic "chat" trait that delivery clients must implement.
#[async_trait]
pub trait GenericChatClient {
    /// Start the inbound message listener.
    async fn start(&self) -> Void;
    /// Send a message to a channel.
    async fn send_message(&self, target_id: &str, kind: ChannelKind, text: &str) -> Res<MessageHandle>;
    /// Reply to the sender of an incoming message.
    async fn reply(&self, context: &IncomingMessage, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient + Send + Sync + 'static>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Creates a console chat client for local runs.
    pub fn console(config: &Config, spam: SpamGuard, faq: FaqMatcher, llm: LlmClient, tickets: TicketClient) -> Self {
        Self::new(Arc::new(ConsoleChatClient {
            config: config.clone(),
            spam,
            faq,
            llm,
            tickets,
        }))
    }
}

impl From<ConsoleChatClient> for ChatClient {
    fn from(client: ConsoleChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Console chat client: stdin lines become user messages, outbound messages
/// are printed with their channel tag.  Local development only; real
/// messenger transports are external collaborators behind `GenericChatClient`.
#[derive(Clone)]
pub struct ConsoleChatClient {
    config: Config,
    spam: SpamGuard,
    faq: FaqMatcher,
    llm: LlmClient,
    tickets: TicketClient,
}

#[async_trait]
impl GenericChatClient for ConsoleChatClient {
    async fn start(&self) -> Void {
        info!("Console chat client started; type a message and press enter (Ctrl-C to quit).");

        let chat = ChatClient::from(self.clone());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };

                    if line.trim().is_empty() {
                        continue;
                    }

                    let message = IncomingMessage {
                        user_id: "console".to_string(),
                        display_name: "Console User".to_string(),
                        text: line,
                        language_code: None,
                        messenger: Messenger::Web,
                    };

                    triage::orchestrator::handle_incoming(
                        message,
                        self.config.clone(),
                        self.spam.clone(),
                        self.faq.clone(),
                        self.llm.clone(),
                        self.tickets.clone(),
                        chat.clone(),
                    );
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, target_id: &str, kind: ChannelKind, text: &str) -> Res<MessageHandle> {
        println!("[{kind:?}:{target_id}]\n{text}");

        Ok(MessageHandle(chrono::Utc::now().timestamp_millis().to_string()))
    }

    async fn reply(&self, context: &IncomingMessage, text: &str) -> Void {
        println!("[to {}]\n{text}", context.display_name);

        Ok(())
    }
}
