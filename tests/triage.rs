#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use support_relay::{
    base::{
        config::{Config, ConfigInner, FaqEntry},
        types::{ChannelKind, IncomingMessage, Messenger, Res, TriageOutcome, Void},
    },
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient, MessageHandle},
        llm::{GenericLlmClient, LlmClient},
        tickets::{GenericTicketStore, MemoryTicketStore, TicketClient},
    },
    triage::{faq::FaqMatcher, orchestrator::triage_message, spam::SpamGuard},
};

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self) -> Void;
        async fn send_message(&self, target_id: &str, kind: ChannelKind, text: &str) -> Res<MessageHandle>;
        async fn reply(&self, context: &IncomingMessage, text: &str) -> Void;
    }
}

// Mock LLM client for testing.

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn generate_answer(&self, question: &str) -> Res<Option<String>>;
    }
}

/// Everything the pipeline sent, split by destination.
#[derive(Clone, Default)]
struct Outbox {
    user_replies: Arc<Mutex<Vec<String>>>,
    staff_messages: Arc<Mutex<Vec<String>>>,
}

impl Outbox {
    fn user_replies(&self) -> Vec<String> {
        self.user_replies.lock().unwrap().clone()
    }

    fn staff_messages(&self) -> Vec<String> {
        self.staff_messages.lock().unwrap().clone()
    }
}

/// A chat mock that records every send into the outbox.
fn recording_chat(outbox: &Outbox) -> MockChat {
    let mut mock = MockChat::new();

    let replies = outbox.user_replies.clone();
    mock.expect_reply().returning(move |_, text| {
        replies.lock().unwrap().push(text.to_string());
        Ok(())
    });

    let staff = outbox.staff_messages.clone();
    mock.expect_send_message().returning(move |_, _, text| {
        staff.lock().unwrap().push(text.to_string());
        Ok(MessageHandle("1".to_string()))
    });

    mock.expect_start().returning(|| Ok(()));

    mock
}

/// An LLM mock that always yields the given completion content.
fn canned_llm(content: Option<&str>) -> MockLlm {
    let content = content.map(|s| s.to_string());
    let mut mock = MockLlm::new();

    mock.expect_generate_answer().returning(move |_| Ok(content.clone()));

    mock
}

fn test_config(customize: impl FnOnce(&mut ConfigInner)) -> Config {
    let mut inner = ConfigInner::default();
    customize(&mut inner);

    Config { inner: Arc::new(inner) }
}

fn incoming(text: &str) -> IncomingMessage {
    IncomingMessage {
        user_id: "U1".to_string(),
        display_name: "Test_User*Name".to_string(),
        text: text.to_string(),
        language_code: Some("en".to_string()),
        messenger: Messenger::Telegram,
    }
}

/// An LLM mock whose call never completes; only the timeout gets it unstuck.
struct StalledLlm;

#[async_trait]
impl GenericLlmClient for StalledLlm {
    async fn generate_answer(&self, _question: &str) -> Res<Option<String>> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

/// Helper function to set up the test environment.
fn setup_runtime(config: Config, llm: impl GenericLlmClient + Send + Sync + 'static, outbox: &Outbox) -> (Runtime, Arc<MemoryTicketStore>) {
    let spam = SpamGuard::new(&config);
    let faq = FaqMatcher::new(&config);
    let llm = LlmClient::new(Arc::new(llm), &config);

    let store = Arc::new(MemoryTicketStore::new());
    let tickets = TicketClient::new(store.clone());

    let chat = ChatClient::new(Arc::new(recording_chat(outbox)));

    (Runtime { config, spam, faq, llm, tickets, chat }, store)
}

async fn run(runtime: &Runtime, message: &IncomingMessage) -> TriageOutcome {
    triage_message(message, &runtime.config, &runtime.spam, &runtime.faq, &runtime.llm, &runtime.tickets, &runtime.chat)
        .await
        .expect("triage must not fail")
}

// Tests.

#[tokio::test]
async fn unmatched_message_becomes_a_ticket_with_confirmation() {
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(test_config(|_| {}), canned_llm(None), &outbox);

    let outcome = run(&runtime, &incoming("asdf123")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(outbox.user_replies(), vec!["Thank you for contacting us.\n".to_string()]);
    assert_eq!(outbox.staff_messages().len(), 1);
}

#[tokio::test]
async fn staff_forward_carries_ticket_id_and_escaped_name() {
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(test_config(|_| {}), canned_llm(None), &outbox);

    run(&runtime, &incoming("please help")).await;

    let forward = &outbox.staff_messages()[0];
    assert!(forward.contains("Ticket #1"));
    assert!(forward.contains("Test\\_User\\*Name"));
    assert!(forward.contains("please help"));
}

#[tokio::test]
async fn ticket_route_forward_never_carries_the_auto_reply_note() {
    // Even with show_auto_replied set: no auto-reply reached the user here.
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
        c.show_auto_replied = true;
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(Some("null")), &outbox);

    let outcome = run(&runtime, &incoming("unanswerable")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    let note = &runtime.config.strings.auto_replied_note;
    assert!(!outbox.staff_messages()[0].contains(note.trim()));
}

#[tokio::test]
async fn spam_threshold_rejects_with_the_notice() {
    let config = test_config(|c| c.spam_max = 2);
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(None), &outbox);

    let message = incoming("hello");
    assert_eq!(run(&runtime, &message).await, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(run(&runtime, &message).await, TriageOutcome::TicketForwarded { ticket_id: 1 });

    // Third and fourth messages are both rejected; the counter stops advancing.
    assert_eq!(run(&runtime, &message).await, TriageOutcome::Rejected);
    assert_eq!(run(&runtime, &message).await, TriageOutcome::Rejected);

    let replies = outbox.user_replies();
    let notice = &runtime.config.strings.spam_notice;
    assert_eq!(replies.iter().filter(|r| *r == notice).count(), 2);

    // Rejected messages are never forwarded to staff.
    assert_eq!(outbox.staff_messages().len(), 2);
}

#[tokio::test]
async fn faq_match_sends_templated_reply() {
    let config = test_config(|c| {
        c.faq = vec![
            FaqEntry {
                question: "opening hours".to_string(),
                answer: "We are open 9-5.".to_string(),
            },
            FaqEntry {
                question: "hours".to_string(),
                answer: "See our website.".to_string(),
            },
        ];
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(None), &outbox);

    let outcome = run(&runtime, &incoming("What are your opening hours?")).await;

    assert_eq!(outcome, TriageOutcome::FaqAnswered);

    let reply = &outbox.user_replies()[0];
    // Earlier-listed entry wins; name escaped, answer verbatim.
    assert!(reply.contains("We are open 9-5."));
    assert!(!reply.contains("See our website."));
    assert!(reply.contains("Test\\_User\\*Name"));

    // Not a ticket, and not forwarded without show_auto_replied.
    assert!(outbox.staff_messages().is_empty());
}

#[tokio::test]
async fn clean_replies_sends_the_raw_answer() {
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
        c.clean_replies = true;
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(Some("*Important:* answer")), &outbox);

    let outcome = run(&runtime, &incoming("question")).await;

    assert_eq!(outcome, TriageOutcome::LlmAnswered);
    assert_eq!(outbox.user_replies(), vec!["*Important:* answer".to_string()]);
}

#[tokio::test]
async fn templated_llm_reply_escapes_name_but_not_answer() {
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(Some("*Important:* answer")), &outbox);

    let outcome = run(&runtime, &incoming("question")).await;

    assert_eq!(outcome, TriageOutcome::LlmAnswered);

    let reply = &outbox.user_replies()[0];
    assert!(reply.contains("Test\\_User\\*Name"));
    assert!(reply.contains("*Important:* answer"));
    assert!(reply.ends_with(&runtime.config.strings.signature));
}

#[tokio::test]
async fn llm_disabled_skips_the_responder_entirely() {
    let mut llm = MockLlm::new();
    llm.expect_generate_answer().never();

    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(test_config(|_| {}), llm, &outbox);

    let outcome = run(&runtime, &incoming("asdf123")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
}

#[tokio::test]
async fn llm_error_falls_back_to_ticket_routing() {
    let mut llm = MockLlm::new();
    llm.expect_generate_answer().returning(|_| Err(anyhow::anyhow!("connection refused")));

    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, llm, &outbox);

    let outcome = run(&runtime, &incoming("question")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(outbox.user_replies(), vec!["Thank you for contacting us.\n".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn llm_timeout_falls_back_to_ticket_routing() {
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
        c.llm_timeout_secs = 1;
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, StalledLlm, &outbox);

    let outcome = run(&runtime, &incoming("question")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(outbox.user_replies(), vec!["Thank you for contacting us.\n".to_string()]);
}

#[tokio::test]
async fn whitespace_answer_falls_back_to_ticket_routing() {
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
    });
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(Some("   \n")), &outbox);

    assert_eq!(run(&runtime, &incoming("question")).await, TriageOutcome::TicketForwarded { ticket_id: 1 });
}

#[tokio::test]
async fn auto_replied_forward_is_annotated_and_flagged() {
    let config = test_config(|c| {
        c.use_llm = true;
        c.openai_api_key = "test_key".to_string();
        c.show_auto_replied = true;
    });
    let outbox = Outbox::default();
    let (runtime, store) = setup_runtime(config, canned_llm(Some("An answer.")), &outbox);

    let message = incoming("question");
    let outcome = run(&runtime, &message).await;

    assert_eq!(outcome, TriageOutcome::LlmAnswered);

    // Exactly one user reply, plus one annotated staff forward.
    assert_eq!(outbox.user_replies().len(), 1);
    let forwards = outbox.staff_messages();
    assert_eq!(forwards.len(), 1);
    assert!(forwards[0].contains(runtime.config.strings.auto_replied_note.trim()));

    let ticket = store.open_ticket_for(&message.user_id, message.messenger).await.unwrap().unwrap();
    assert!(ticket.auto_replied);
    assert_eq!(store.recorded_messages(ticket.id), vec!["question".to_string()]);
}

#[tokio::test]
async fn confirmation_is_suppressed_when_disabled() {
    let config = test_config(|c| c.autoreply_confirmation = false);
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(None), &outbox);

    let outcome = run(&runtime, &incoming("silent ticket")).await;

    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert!(outbox.user_replies().is_empty());
    assert_eq!(outbox.staff_messages().len(), 1);
}

#[tokio::test]
async fn show_user_ticket_puts_the_id_in_the_confirmation() {
    let config = test_config(|c| c.show_user_ticket = true);
    let outbox = Outbox::default();
    let (runtime, _store) = setup_runtime(config, canned_llm(None), &outbox);

    run(&runtime, &incoming("help")).await;

    let reply = &outbox.user_replies()[0];
    assert!(reply.starts_with("Thank you for contacting us.\n"));
    assert!(reply.contains("#1"));
}

#[tokio::test]
async fn second_message_reuses_the_open_ticket() {
    let outbox = Outbox::default();
    let (runtime, store) = setup_runtime(test_config(|_| {}), canned_llm(None), &outbox);

    assert_eq!(run(&runtime, &incoming("first")).await, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(run(&runtime, &incoming("second")).await, TriageOutcome::TicketForwarded { ticket_id: 1 });

    assert_eq!(store.recorded_messages(1), vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn staff_forward_failure_is_not_resurfaced_to_the_user() {
    let outbox = Outbox::default();

    let mut chat = MockChat::new();
    let replies = outbox.user_replies.clone();
    chat.expect_reply().returning(move |_, text| {
        replies.lock().unwrap().push(text.to_string());
        Ok(())
    });
    chat.expect_send_message().returning(|_, _, _| Err(anyhow::anyhow!("staff channel unavailable")));

    let config = test_config(|_| {});
    let spam = SpamGuard::new(&config);
    let faq = FaqMatcher::new(&config);
    let llm = LlmClient::new(Arc::new(canned_llm(None)), &config);
    let store = Arc::new(MemoryTicketStore::new());
    let tickets = TicketClient::new(store.clone());
    let chat = ChatClient::new(Arc::new(chat));

    let outcome = triage_message(&incoming("help"), &config, &spam, &faq, &llm, &tickets, &chat).await.unwrap();

    // The pipeline still terminates as a forwarded ticket and the message is recorded.
    assert_eq!(outcome, TriageOutcome::TicketForwarded { ticket_id: 1 });
    assert_eq!(outbox.user_replies().len(), 1);
    assert_eq!(store.recorded_messages(1), vec!["help".to_string()]);
}
