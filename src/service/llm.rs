//! Knowledge responder: a thin wrapper around async-openai for grounded answers.

use std::{ops::Deref, sync::Arc, time::Duration};

use crate::base::types::{IncomingMessage, Res};
use crate::base::{config::Config, prompts};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

/// Literal token the model emits when the knowledge base lacks the answer.
/// Matched case-sensitively after trimming surrounding whitespace.
pub const NO_ANSWER_SENTINEL: &str = "null";

// Traits.

/// Generic LLM client trait that clients must implement.
#[async_trait]
pub trait GenericLlmClient {
    /// Run one completion for the user's question against the knowledge base.
    ///
    /// `Ok(None)` means the response carried no usable message content.
    /// Sentinel and whitespace normalization happens in the wrapper, so
    /// implementations return the content as-is.
    async fn generate_answer(&self, question: &str) -> Res<Option<String>>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient + Send + Sync + 'static>,
    timeout: Duration,
    log_responses: bool,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient + Send + Sync + 'static>, config: &Config) -> Self {
        Self {
            inner,
            timeout: Duration::from_secs(config.llm_timeout_secs),
            log_responses: config.log_llm_responses,
        }
    }

    pub fn openai(config: &Config) -> Self {
        Self::new(Arc::new(OpenAiKnowledgeClient::new(config)), config)
    }

    /// Answer a user message from the knowledge base, or report "no answer."
    ///
    /// Transport errors, timeouts, malformed payloads, the no-answer sentinel,
    /// and whitespace-only content all yield `None`; the pipeline then falls
    /// through to ticket routing.  The answer text is returned unmodified and
    /// must never be re-escaped, since the model produces the target markup
    /// dialect itself.
    #[instrument(skip_all, fields(user_id = %message.user_id))]
    pub async fn knowledge_answer(&self, message: &IncomingMessage) -> Option<String> {
        let result = tokio::time::timeout(self.timeout, self.generate_answer(&message.text)).await;

        let answer = match result {
            Err(_) => {
                warn!("Knowledge responder timed out after {:?}; treating as no answer.", self.timeout);
                return None;
            }
            Ok(Err(err)) => {
                error!("Knowledge responder failed: {err}");
                return None;
            }
            Ok(Ok(answer)) => answer?,
        };

        let trimmed = answer.trim();

        if trimmed.is_empty() || trimmed == NO_ANSWER_SENTINEL {
            debug!("Knowledge base had no answer.");
            return None;
        }

        if self.log_responses {
            info!(
                user_id = %message.user_id,
                display_name = %message.display_name,
                question = %message.text,
                answer = %answer,
                "Knowledge responder answered."
            );
        }

        Some(answer)
    }
}

// Specific implementations.

/// OpenAI-backed knowledge responder.
///
/// The client and the assembled system message are built once from the
/// configuration and reused for every call.
pub struct OpenAiKnowledgeClient {
    client: Client<OpenAIConfig>,
    model: String,
    system_message: String,
}

impl OpenAiKnowledgeClient {
    pub fn new(config: &Config) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        if let Some(base_url) = &config.openai_base_url {
            cfg = cfg.with_api_base(base_url.clone());
        }

        Self {
            client: Client::with_config(cfg),
            model: config.openai_model.clone(),
            system_message: prompts::build_system_message(config),
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiKnowledgeClient {
    #[instrument(skip_all)]
    async fn generate_answer(&self, question: &str) -> Res<Option<String>> {
        debug!("Querying the knowledge base.");

        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(self.system_message.clone()),
                name: Some("System".to_string()),
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(question.to_string()),
                name: Some("User".to_string()),
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default().model(&self.model).messages(messages).build()?;

        let response = self.client.chat().create(request).await?;
        let content = response.choices.first().and_then(|choice| choice.message.content.clone());

        Ok(content)
    }
}
