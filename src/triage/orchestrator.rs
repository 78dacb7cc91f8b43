//! The message-triage state machine.
//!
//! Each incoming message walks, in order: spam check, FAQ lookup, knowledge
//! responder, ticket routing.  Every stage can short-circuit, and every path
//! is terminal after at most one user-facing reply; a staff-channel forward
//! may occur in addition.

use std::time::Instant;

use tracing::Instrument;

use crate::{
    base::{
        markup::escape_for_markup,
        types::{ChannelKind, IncomingMessage, Ticket, TriageOutcome},
    },
    prelude::*,
    service::{chat::ChatClient, llm::LlmClient, tickets::TicketClient},
    triage::{faq::FaqMatcher, spam::SpamGuard},
};

/// Handles one incoming user message.
///
/// Spawns a task so that one user's pipeline (and in particular its LLM
/// round trip) never blocks another's.  Errors are logged here, not raised.
#[instrument(skip_all)]
pub fn handle_incoming(message: IncomingMessage, config: Config, spam: SpamGuard, faq: FaqMatcher, llm: LlmClient, tickets: TicketClient, chat: ChatClient) {
    tokio::spawn(async move {
        // Process the message.
        let result = triage_message(&message, &config, &spam, &faq, &llm, &tickets, &chat).in_current_span().await;

        // Log any errors.
        if let Err(err) = &result {
            error!("Error while handling message: {}", err);
        }
    });
}

/// Run one message through the triage pipeline to its terminal outcome.
#[instrument(skip_all, fields(user_id = %message.user_id))]
pub async fn triage_message(
    message: &IncomingMessage,
    config: &Config,
    spam: &SpamGuard,
    faq: &FaqMatcher,
    llm: &LlmClient,
    tickets: &TicketClient,
    chat: &ChatClient,
) -> Res<TriageOutcome> {
    // Spam check: blocked users get the notice and nothing else.
    if spam.check_and_record(&message.user_id, Instant::now()) {
        info!("Message rejected by the spam guard.");
        chat.reply(message, &config.strings.spam_notice).await?;

        return Ok(TriageOutcome::Rejected);
    }

    // FAQ lookup.
    if let Some(answer) = faq.find(&message.text) {
        info!("Message answered from the FAQ table.");
        chat.reply(message, &templated_reply(config, message, answer)).await?;
        forward_auto_replied(config, message, tickets, chat).await;

        return Ok(TriageOutcome::FaqAnswered);
    }

    // Knowledge responder.  "No answer" (including errors and timeouts)
    // falls through to ticket routing.
    if config.use_llm {
        if let Some(answer) = llm.knowledge_answer(message).await {
            info!("Message answered from the knowledge base.");

            let reply = if config.clean_replies { answer } else { templated_reply(config, message, &answer) };
            chat.reply(message, &reply).await?;
            forward_auto_replied(config, message, tickets, chat).await;

            return Ok(TriageOutcome::LlmAnswered);
        }
    }

    // Ticket routing: the default and fallback.
    let ticket = get_or_create_ticket(message, tickets).await?;

    if config.autoreply_confirmation {
        let mut confirmation = config.strings.confirmation.clone();

        if config.show_user_ticket {
            confirmation.push_str(&config.strings.ticket_line.replace("{ticket}", &ticket.id.to_string()));
        }

        chat.reply(message, &confirmation).await?;
    }

    // No auto-reply reached the user on this path, so the forward carries no
    // auto-reply annotation.  The user already has their confirmation; a
    // failed forward is logged, never resurfaced.
    let forward = staff_forward_text(config, message, ticket.id, false);

    if let Err(err) = chat.send_message(&config.staff_channel_id, ChannelKind::Staff, &forward).await {
        error!("Failed to forward ticket #{} to staff: {}", ticket.id, err);
    }

    tickets.record_message(ticket.id, &message.text).await?;

    info!(ticket_id = ticket.id, "Ticket message forwarded to staff.");

    Ok(TriageOutcome::TicketForwarded { ticket_id: ticket.id })
}

/// Greeting + answer + signature.  The display name is escaped because the
/// user controls it; the answer is inserted verbatim because the FAQ table and
/// the model already produce the target markup dialect.
fn templated_reply(config: &Config, message: &IncomingMessage, answer: &str) -> String {
    let name = escape_for_markup(config.markup_mode, &message.display_name);
    let greeting = config.strings.greeting.replace("{name}", &name);

    format!("{greeting}{answer}{}", config.strings.signature)
}

/// Staff-channel rendering of a user message, tagged with its ticket id.
fn staff_forward_text(config: &Config, message: &IncomingMessage, ticket_id: u64, auto_replied: bool) -> String {
    let name = escape_for_markup(config.markup_mode, &message.display_name);
    let header = config.strings.forward_header.replace("{ticket}", &ticket_id.to_string()).replace("{name}", &name);

    let mut text = format!("{header}{}", message.text);

    if auto_replied {
        text.push('\n');
        text.push_str(&config.strings.auto_replied_note);
    }

    text
}

async fn get_or_create_ticket(message: &IncomingMessage, tickets: &TicketClient) -> Res<Ticket> {
    match tickets.open_ticket_for(&message.user_id, message.messenger).await? {
        Some(ticket) => Ok(ticket),
        None => tickets.create_ticket(&message.user_id, message.messenger).await,
    }
}

/// After an auto-reply reached the user, optionally forward the original
/// message to staff, annotated as auto-replied.  Failures here are logged and
/// swallowed: the user already has their answer.
async fn forward_auto_replied(config: &Config, message: &IncomingMessage, tickets: &TicketClient, chat: &ChatClient) {
    if !config.show_auto_replied {
        return;
    }

    if let Err(err) = forward_auto_replied_internal(config, message, tickets, chat).await {
        error!("Failed to forward auto-replied message to staff: {}", err);
    }
}

async fn forward_auto_replied_internal(config: &Config, message: &IncomingMessage, tickets: &TicketClient, chat: &ChatClient) -> Void {
    let ticket = get_or_create_ticket(message, tickets).await?;

    tickets.mark_auto_replied(ticket.id).await?;

    let forward = staff_forward_text(config, message, ticket.id, true);
    chat.send_message(&config.staff_channel_id, ChannelKind::Staff, &forward).await?;

    tickets.record_message(ticket.id, &message.text).await?;

    info!(ticket_id = ticket.id, "Auto-replied message forwarded to staff.");

    Ok(())
}
