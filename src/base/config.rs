//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::markup::MarkupMode;

use super::types::Res;

/// Default OpenAI model for the knowledge responder.
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default upper bound on a single knowledge-responder call.
fn default_llm_timeout_secs() -> u64 {
    30
}

/// Default maximum number of messages per user per spam window.
fn default_spam_max() -> u32 {
    5
}

/// Default spam window length in seconds.
fn default_spam_window_secs() -> u64 {
    300
}

/// Default staff channel id.
fn default_staff_channel_id() -> String {
    "staff".to_string()
}

fn default_true() -> bool {
    true
}

fn default_spam_notice() -> String {
    "You are sending too many messages. Please wait a few minutes and try again.\n".to_string()
}

fn default_confirmation() -> String {
    "Thank you for contacting us.\n".to_string()
}

fn default_greeting() -> String {
    "Dear {name},\n\n".to_string()
}

fn default_signature() -> String {
    "\n\nYour support team".to_string()
}

fn default_ticket_line() -> String {
    "Your ticket number is #{ticket}.\n".to_string()
}

fn default_forward_header() -> String {
    "Ticket #{ticket} from {name}:\n".to_string()
}

fn default_auto_replied_note() -> String {
    "An automated reply was sent to the user.\n".to_string()
}

/// One FAQ rule: if `question` occurs in the user's text, reply with `answer`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Language strings table for every user- and staff-facing message.
#[derive(Debug, Deserialize, Clone)]
pub struct Strings {
    /// Sent when the spam guard rejects a message (`strings.spam_notice`).
    #[serde(default = "default_spam_notice")]
    pub spam_notice: String,
    /// Sent when a message is forwarded as a ticket (`strings.confirmation`).
    #[serde(default = "default_confirmation")]
    pub confirmation: String,
    /// Greeting template for auto-replies; `{name}` is the escaped display name (`strings.greeting`).
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Signature appended to auto-replies (`strings.signature`).
    #[serde(default = "default_signature")]
    pub signature: String,
    /// Appended to the confirmation when `show_user_ticket` is set; `{ticket}` is the ticket id (`strings.ticket_line`).
    #[serde(default = "default_ticket_line")]
    pub ticket_line: String,
    /// Header of every staff forward; `{ticket}` and `{name}` are substituted (`strings.forward_header`).
    #[serde(default = "default_forward_header")]
    pub forward_header: String,
    /// Annotation on staff forwards of auto-replied messages (`strings.auto_replied_note`).
    #[serde(default = "default_auto_replied_note")]
    pub auto_replied_note: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            spam_notice: default_spam_notice(),
            confirmation: default_confirmation(),
            greeting: default_greeting(),
            signature: default_signature(),
            ticket_line: default_ticket_line(),
            forward_header: default_forward_header(),
            auto_replied_note: default_auto_replied_note(),
        }
    }
}

/// Configuration for the support-relay application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Whether the knowledge responder runs at all (`USE_LLM`).
    #[serde(default)]
    pub use_llm: bool,
    /// OpenAI API key (`OPENAI_API_KEY`); required when `use_llm` is set.
    #[serde(default)]
    pub openai_api_key: String,
    /// OpenAI model for the knowledge responder (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Optional custom API base URL, e.g. for a proxy (`OPENAI_BASE_URL`).
    #[serde(default)]
    pub openai_base_url: Option<String>,
    /// Optional system-prompt override; the built-in prompt is used otherwise (`SYSTEM_PROMPT`).
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Knowledge-base text the model is grounded on (`KNOWLEDGE_TEXT`).
    #[serde(default)]
    pub knowledge_text: String,
    /// Log each LLM exchange (user, question, raw answer) for observability (`LOG_LLM_RESPONSES`).
    #[serde(default)]
    pub log_llm_responses: bool,
    /// Upper bound on a single knowledge-responder call, in seconds (`LLM_TIMEOUT_SECS`).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    /// Send LLM answers verbatim, without the greeting/signature template (`CLEAN_REPLIES`).
    #[serde(default)]
    pub clean_replies: bool,
    /// Also forward auto-replied messages to the staff channel (`SHOW_AUTO_REPLIED`).
    #[serde(default)]
    pub show_auto_replied: bool,
    /// Send the user a confirmation when a message is forwarded as a ticket (`AUTOREPLY_CONFIRMATION`).
    #[serde(default = "default_true")]
    pub autoreply_confirmation: bool,
    /// Include the ticket id in the user's confirmation (`SHOW_USER_TICKET`).
    #[serde(default)]
    pub show_user_ticket: bool,
    /// Markup dialect of the target messenger (`MARKUP_MODE`).
    #[serde(default)]
    pub markup_mode: MarkupMode,
    /// Ordered FAQ table; the first matching entry wins.
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    /// Match FAQ fragments case-insensitively (`FAQ_CASE_INSENSITIVE`).
    #[serde(default = "default_true")]
    pub faq_case_insensitive: bool,
    /// Maximum messages per user inside one spam window (`SPAM_MAX`).
    #[serde(default = "default_spam_max")]
    pub spam_max: u32,
    /// Spam window length in seconds (`SPAM_WINDOW_SECS`).
    #[serde(default = "default_spam_window_secs")]
    pub spam_window_secs: u64,
    /// Staff channel id tickets are forwarded to (`STAFF_CHANNEL_ID`).
    #[serde(default = "default_staff_channel_id")]
    pub staff_channel_id: String,
    /// Language strings table.
    #[serde(default)]
    pub strings: Strings,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            use_llm: false,
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            openai_base_url: None,
            system_prompt: None,
            knowledge_text: String::new(),
            log_llm_responses: false,
            llm_timeout_secs: default_llm_timeout_secs(),
            clean_replies: false,
            show_auto_replied: false,
            autoreply_confirmation: true,
            show_user_ticket: false,
            markup_mode: MarkupMode::default(),
            faq: Vec::new(),
            faq_case_insensitive: true,
            spam_max: default_spam_max(),
            spam_window_secs: default_spam_window_secs(),
            staff_channel_id: default_staff_channel_id(),
            strings: Strings::default(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("SUPPORT_RELAY"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Startup validation of every recognized option.
    pub fn validate(&self) -> Res<()> {
        if self.spam_max < 1 {
            return Err(anyhow::anyhow!("Spam threshold must be at least 1."));
        }

        if self.spam_window_secs < 1 || self.spam_window_secs > 86_400 {
            return Err(anyhow::anyhow!("Spam window must be between 1 second and 1 day."));
        }

        if self.llm_timeout_secs < 1 || self.llm_timeout_secs > 600 {
            return Err(anyhow::anyhow!("LLM timeout must be between 1 and 600 seconds."));
        }

        if self.use_llm && self.openai_api_key.is_empty() {
            return Err(anyhow::anyhow!("An OpenAI API key is required when the LLM is enabled."));
        }

        if self.staff_channel_id.is_empty() {
            return Err(anyhow::anyhow!("A staff channel id is required."));
        }

        if !self.strings.greeting.contains("{name}") {
            return Err(anyhow::anyhow!("The greeting string must contain the `{{name}}` placeholder."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config {
            inner: Arc::new(ConfigInner::default()),
        };

        assert!(config.validate().is_ok());
        assert!(config.autoreply_confirmation);
        assert_eq!(config.strings.confirmation, "Thank you for contacting us.\n");
    }

    #[test]
    fn llm_requires_api_key() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                use_llm: true,
                ..Default::default()
            }),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_spam_threshold_is_rejected() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                spam_max: 0,
                ..Default::default()
            }),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn greeting_must_carry_name_placeholder() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                strings: Strings {
                    greeting: "Hello,\n\n".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
        };

        assert!(config.validate().is_err());
    }
}
