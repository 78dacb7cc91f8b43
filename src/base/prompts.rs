//! System prompt for the knowledge responder.

use crate::base::config::Config;

/// Built-in system prompt for the knowledge responder.
///
/// The model is restricted to the supplied knowledge base and must reply with
/// the literal token `null` whenever the knowledge base lacks the answer, so
/// the pipeline can fall through to ticket routing.
pub const KNOWLEDGE_SYSTEM_PROMPT: &str = r#####"
You are a support agent for a company.  You answer user questions strictly from the knowledge base provided below the delimiter.  You are not a general-purpose assistant: if the knowledge base does not contain the answer to the user's question, reply with the single literal token `null` and nothing else, so that the question can be forwarded to a human support agent instead.

Rules:
- Answer only from the knowledge base.  Never invent facts, prices, dates, or procedures that are not in it.
- If the knowledge base lacks the answer, or you are unsure, reply exactly `null`.
- Do not greet the user, do not sign off, and do not use emoji.  The surrounding application adds its own greeting and signature.
- Answer in the language the user wrote in, when the knowledge base allows it.
- Use only the messenger's lightweight markup subset: *bold*, _italic_, `code`.  No tables, no HTML, no headings.
"#####;

/// Delimiter separating the instructions from the knowledge-base text, so the
/// model can distinguish reference material from directives.
pub const KNOWLEDGE_DELIMITER: &str = "\n\n----- KNOWLEDGE BASE -----\n\n";

/// Assemble the full system message: prompt (config override or built-in
/// default), delimiter, then the literal knowledge-base text.
pub fn build_system_message(config: &Config) -> String {
    let prompt = config.system_prompt.as_deref().unwrap_or(KNOWLEDGE_SYSTEM_PROMPT);

    format!("{prompt}{KNOWLEDGE_DELIMITER}{}", config.knowledge_text)
}
