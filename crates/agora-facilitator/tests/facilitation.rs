use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use agora_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use agora_evidence::{EvidenceError, EvidenceSource, SearchBackend, SearchHit};
use agora_facilitator::{
    ExplicitRequestContext, FacilitationEvent, FacilitatorStore, FactChecker, InterventionPolicy,
    NewFacilitatorMessage, NewVerdictRecord, Notifier, Orchestrator, SqliteStore, StoreError,
    Summarizer,
};
use agora_gateway::{
    CompletionBackend, GatewayConfig, GatewayError, GenerateRequest, GenerateResponse,
    ModelGateway,
};
use agora_threads::{CreateMessageParams, CreateThreadParams, Message};
use agora_types::{
    ActionKind, ConversationState, EventContext, InterventionLevel, MessageKind, Priority,
    Summary, ThreadConfig, VerdictStatus, VERIFY_EMOJI,
};
use async_trait::async_trait;

const SUMMARY_REPLY: &str = r#"{"topic": "Planning the spring retreat",
    "key_points": ["The budget is fixed"],
    "agreements": ["Somewhere near the coast"],
    "disagreements": ["Which weekend"],
    "open_questions": [],
    "next_steps": ["Bob checks venues"]}"#;

struct CannedBackend {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl CannedBackend {
    fn new(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn calls(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for CannedBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(GatewayError::Unreachable {
                url: "canned".to_string(),
                reason: "no replies left".to_string(),
            })
        })?;
        Ok(GenerateResponse {
            model: request.model.clone(),
            text: reply,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        Ok(vec!["test-model".to_string()])
    }
}

struct StaticSearch(Vec<SearchHit>);

#[async_trait]
impl SearchBackend for StaticSearch {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, EvidenceError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, FacilitationEvent, serde_json::Value)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<FacilitationEvent> {
        self.sent.lock().unwrap().iter().map(|(_, e, _)| *e).collect()
    }

    fn payload(&self, event: FacilitationEvent) -> Option<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .find(|(_, e, _)| *e == event)
            .map(|(_, _, p)| p.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, thread_id: &str, event: FacilitationEvent, payload: serde_json::Value) {
        self.sent
            .lock()
            .unwrap()
            .push((thread_id.to_string(), event, payload));
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    pool: DbPool,
    store: Arc<SqliteStore>,
    backend: Arc<CannedBackend>,
    notifier: Arc<RecordingNotifier>,
    orchestrator: Orchestrator,
}

fn gateway(backend: Arc<CannedBackend>) -> ModelGateway {
    ModelGateway::new(
        backend,
        GatewayConfig {
            default_model: "test-model".to_string(),
            ..GatewayConfig::default()
        },
    )
}

fn open_pool() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("agora.db");
    let pool = create_pool(path.to_str().expect("utf-8 path"), DbRuntimeSettings::default())
        .expect("pool");
    run_migrations(&pool.get().expect("connection")).expect("migrations");
    (dir, pool)
}

fn harness(replies: &[&str], hits: Vec<SearchHit>) -> Harness {
    harness_with_store(replies, hits, |pool| -> Arc<dyn FacilitatorStore> {
        Arc::new(SqliteStore::new(pool))
    })
}

fn harness_with_store(
    replies: &[&str],
    hits: Vec<SearchHit>,
    wrap: impl FnOnce(DbPool) -> Arc<dyn FacilitatorStore>,
) -> Harness {
    let (dir, pool) = open_pool();
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let facade = wrap(pool.clone());
    let backend = CannedBackend::replying(replies);
    let notifier = Arc::new(RecordingNotifier::default());
    let search: Arc<dyn SearchBackend> = Arc::new(StaticSearch(hits));
    let evidence = EvidenceSource::new(vec![search]);
    let orchestrator = Orchestrator::new(
        facade.clone(),
        notifier.clone(),
        InterventionPolicy,
        Summarizer::new(facade, gateway(backend.clone())),
        FactChecker::new(evidence, gateway(backend.clone())),
    );
    Harness {
        _dir: dir,
        pool,
        store,
        backend,
        notifier,
        orchestrator,
    }
}

impl Harness {
    fn create_thread(&self, level: InterventionLevel, frequency: u32) {
        let conn = self.pool.get().expect("connection");
        agora_threads::create_thread(
            &conn,
            &CreateThreadParams {
                intervention_level: Some(level),
                summary_frequency: Some(frequency),
                ..CreateThreadParams::new("t-1", "Spring retreat")
            },
        )
        .expect("create thread");
    }

    fn post(&self, id: &str, author: &str, content: &str) -> Message {
        let conn = self.pool.get().expect("connection");
        agora_threads::create_message(
            &conn,
            &CreateMessageParams {
                thread_id: "t-1".to_string(),
                message_id: id.to_string(),
                author_id: author.to_lowercase(),
                author_name: author.to_string(),
                kind: MessageKind::User,
                content: content.to_string(),
                metadata: None,
            },
        )
        .expect("create message")
    }

    fn thread(&self) -> ThreadConfig {
        agora_threads::get_thread(&self.pool.get().expect("connection"), "t-1").expect("thread")
    }

    fn facilitator_messages(&self) -> Vec<Message> {
        agora_threads::list_messages(&self.pool.get().expect("connection"), "t-1", None, None)
            .expect("list")
            .into_iter()
            .filter(|m| m.kind.is_facilitator())
            .collect()
    }

    fn new_message_event(message: &Message) -> EventContext {
        EventContext::NewMessage {
            message_id: Some(message.message_id.clone()),
            text: message.content.clone(),
            author: message.author_name.clone(),
        }
    }
}

fn hit(title: &str, url: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: format!("{title} snippet"),
    }
}

#[tokio::test]
async fn summary_due_at_frequency_without_prior_summary() {
    let h = harness(&[], vec![]);
    h.create_thread(InterventionLevel::Balanced, 15);
    let mut last = None;
    for i in 0..15 {
        last = Some(h.post(&format!("m-{i}"), "Alice", "sounds good"));
    }
    let thread = h.thread();
    assert_eq!(thread.message_count, 15);
    assert!(thread.last_summary_at.is_none());

    let event = Harness::new_message_event(&last.expect("message"));
    let decision = InterventionPolicy
        .decide(h.store.as_ref(), &thread, &event)
        .await;
    assert!(decision.should_act());
    assert_eq!(decision.action(), ActionKind::Summary);
    assert_eq!(decision.priority(), Priority::Normal);
}

#[tokio::test]
async fn active_thread_flags_high_impact_statistic() {
    let h = harness(&[], vec![]);
    h.create_thread(InterventionLevel::Active, 15);
    let text = "studies show 90% of people who skip breakfast gain weight";
    let message = h.post("m-1", "Alice", text);

    let decision = InterventionPolicy
        .decide(h.store.as_ref(), &h.thread(), &Harness::new_message_event(&message))
        .await;
    assert!(decision.should_act());
    assert_eq!(decision.action(), ActionKind::FactCheck);
    assert_eq!(decision.priority(), Priority::High);
    assert_eq!(decision.claim_text(), Some(text));
}

#[tokio::test]
async fn claim_without_evidence_is_never_verified() {
    for reply in [
        r#"{"status": "verified", "confidence": 0.9, "explanation": "Widely reported."}"#,
        r#"{"status": "uncertain", "confidence": 0.2, "explanation": "Nothing found."}"#,
    ] {
        let backend = CannedBackend::replying(&[reply]);
        let checker = FactChecker::new(EvidenceSource::new(vec![]), gateway(backend.clone()));
        let outcome = checker
            .check("coffee cures cancer", None)
            .await
            .expect("fact-check");
        assert!(matches!(
            outcome.verdict.status,
            VerdictStatus::Unverified | VerdictStatus::Uncertain
        ));
        assert!(outcome.verdict.evidence.is_empty());

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].json);
        assert_eq!(calls[0].temperature, Some(0.3));
        assert!(calls[0].prompt.contains("No search results were found."));
    }
}

#[tokio::test]
async fn verify_reaction_fact_checks_under_every_configuration() {
    let h = harness(&[], vec![]);
    h.create_thread(InterventionLevel::Minimal, 1);
    let message = h.post("m-1", "Alice", "hello");
    let event = EventContext::Reaction {
        emoji: VERIFY_EMOJI.to_string(),
        message_id: message.message_id.clone(),
    };

    for level in [
        InterventionLevel::Minimal,
        InterventionLevel::Balanced,
        InterventionLevel::Active,
    ] {
        for auto in [true, false] {
            let thread = ThreadConfig {
                intervention_level: level,
                auto_summary_enabled: auto,
                auto_fact_check_enabled: auto,
                ..h.thread()
            };
            let decision = InterventionPolicy
                .decide(h.store.as_ref(), &thread, &event)
                .await;
            assert!(decision.should_act());
            assert_eq!(decision.action(), ActionKind::FactCheck);
            assert_eq!(decision.priority(), Priority::Normal);
        }
    }
}

#[tokio::test]
async fn summary_round_persists_message_state_and_notifies() {
    let h = harness(&[SUMMARY_REPLY], vec![]);
    h.create_thread(InterventionLevel::Balanced, 3);
    h.post("m-1", "Alice", "Let's do the retreat in April");
    h.post("m-2", "Bob", "May works better for me");
    let last = h.post("m-3", "Carol", "Either is fine if it's by the sea");

    let report = h
        .orchestrator
        .handle_event("t-1", Harness::new_message_event(&last))
        .await;
    assert!(report.intervened, "{report:?}");
    assert_eq!(report.action, ActionKind::Summary);
    assert!(report.error.is_none());

    let written = h.facilitator_messages();
    assert_eq!(written.len(), 1);
    let summary_msg = &written[0];
    assert_eq!(Some(&summary_msg.message_id), report.message_id.as_ref());
    assert_eq!(summary_msg.kind, MessageKind::LlmSummary);
    assert!(summary_msg
        .content
        .starts_with("Summary: Planning the spring retreat"));
    let metadata = summary_msg.metadata.as_ref().expect("metadata");
    assert_eq!(metadata.trigger_kind, "new_message");
    assert_eq!(metadata.model_id.as_deref(), Some("test-model"));

    let thread = h.thread();
    assert_eq!(thread.state.revision, 1);
    assert_eq!(
        thread.state.topic.as_deref(),
        Some("Planning the spring retreat")
    );
    assert_eq!(thread.state.disagreements, vec!["Which weekend"]);
    assert_eq!(
        thread.last_summary_at.as_deref(),
        Some(last.created_at.as_str())
    );
    assert_eq!(
        h.store
            .count_user_messages_since("t-1", thread.last_summary_at.as_deref())
            .await
            .expect("count"),
        0
    );

    assert_eq!(
        h.notifier.events(),
        vec![FacilitationEvent::SummaryNew, FacilitationEvent::ThreadState]
    );
    let prompt = &h.backend.calls()[0].prompt;
    assert!(prompt.contains("1. Alice: Let's do the retreat in April"));
    assert!(prompt.contains("3. Carol: Either is fine"));
    assert!(prompt.contains("Previous summary topic: None yet"));
}

#[tokio::test]
async fn model_failure_leaves_thread_untouched() {
    let h = harness(&["this is not json"], vec![]);
    h.create_thread(InterventionLevel::Balanced, 1);
    let message = h.post("m-1", "Alice", "hi all");

    let report = h
        .orchestrator
        .handle_event("t-1", Harness::new_message_event(&message))
        .await;
    assert!(!report.intervened);
    assert_eq!(report.action, ActionKind::Summary);
    assert!(report
        .error
        .as_deref()
        .is_some_and(|e| e.contains("invalid structured output")));

    assert!(h.facilitator_messages().is_empty());
    let thread = h.thread();
    assert_eq!(thread.state, ConversationState::default());
    assert!(thread.last_summary_at.is_none());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn minimal_thread_stays_silent_without_model_calls() {
    let h = harness(&[SUMMARY_REPLY], vec![]);
    h.create_thread(InterventionLevel::Minimal, 1);
    let message = h.post("m-1", "Alice", "vaccines cause autism, everyone knows it");

    let report = h
        .orchestrator
        .handle_event("t-1", Harness::new_message_event(&message))
        .await;
    assert!(!report.intervened);
    assert_eq!(report.action, ActionKind::None);
    assert_eq!(report.reason, "minimal intervention mode");
    assert!(h.backend.calls().is_empty());
    assert!(h.facilitator_messages().is_empty());
}

#[tokio::test]
async fn verify_reaction_fact_checks_target_message_and_records_claim() {
    let reply = r#"{"status": "disputed", "confidence": 0.92,
        "explanation": "Health agencies [1] and fact-checkers [2] reject this.",
        "sources": [{"index": 1, "supports": false}, {"index": 2, "supports": false}]}"#;
    let h = harness(
        &[reply],
        vec![
            hit("Blog", "https://example.com/coffee"),
            hit("WHO Q&A", "https://www.who.int/coffee"),
        ],
    );
    h.create_thread(InterventionLevel::Balanced, 15);
    let target = h.post(
        "m-1",
        "Alice",
        "My aunt says drinking coffee cures cancer. Anyway, lunch?",
    );

    let report = h
        .orchestrator
        .handle_event(
            "t-1",
            EventContext::Reaction {
                emoji: VERIFY_EMOJI.to_string(),
                message_id: target.message_id.clone(),
            },
        )
        .await;
    assert!(report.intervened, "{report:?}");
    assert_eq!(report.action, ActionKind::FactCheck);

    let written = h.facilitator_messages();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].kind, MessageKind::LlmFactCheck);
    assert!(written[0].content.starts_with("Fact-check: disputed"));

    let claims =
        agora_threads::list_claims(&h.pool.get().expect("connection"), "t-1").expect("claims");
    assert_eq!(claims.len(), 1);
    let record = &claims[0];
    assert_eq!(record.claim_text, "My aunt says drinking coffee cures cancer");
    assert_eq!(record.status, VerdictStatus::Disputed);
    assert_eq!(record.source_message_id.as_deref(), Some("m-1"));
    assert_eq!(record.verdict_message_id, report.message_id);
    assert_eq!(record.evidence.len(), 2);
    assert!(record.evidence[0].url.contains("who.int"));
    assert!(record.evidence.iter().all(|e| !e.supports));

    let payload = h
        .notifier
        .payload(FacilitationEvent::FactCheckComplete)
        .expect("fact-check notification");
    assert_eq!(payload["verdict"]["status"], "disputed");
    assert_eq!(payload["source_message_id"], "m-1");
}

#[tokio::test]
async fn explicit_fact_check_without_claim_reports_error() {
    let h = harness(&[], vec![]);
    h.create_thread(InterventionLevel::Balanced, 15);

    let report = h
        .orchestrator
        .handle_explicit_request(
            "t-1",
            Some(ActionKind::FactCheck),
            ExplicitRequestContext::default(),
        )
        .await;
    assert!(!report.intervened);
    assert_eq!(report.action, ActionKind::FactCheck);
    assert_eq!(report.error.as_deref(), Some("no claim to fact-check"));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn resolve_request_is_reported_unsupported() {
    let h = harness(&[], vec![]);
    h.create_thread(InterventionLevel::Active, 15);

    let report = h
        .orchestrator
        .handle_explicit_request(
            "t-1",
            Some(ActionKind::Resolve),
            ExplicitRequestContext::default(),
        )
        .await;
    assert!(report.unsupported);
    assert!(!report.intervened);
    assert_eq!(report.action, ActionKind::Resolve);
    assert!(h.facilitator_messages().is_empty());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn unknown_thread_is_reported_not_panicked() {
    let h = harness(&[], vec![]);
    let report = h
        .orchestrator
        .handle_explicit_request("missing", None, ExplicitRequestContext::default())
        .await;
    assert!(!report.intervened);
    assert!(report.error.is_some());
}

/// Delegates to SQLite but runs `before_commit` against the database right
/// before each summary or fact-check commit.
struct HookedStore {
    inner: SqliteStore,
    pool: DbPool,
    before_commit: Box<dyn Fn(&rusqlite::Connection, &str) + Send + Sync>,
}

impl HookedStore {
    fn wrap(
        pool: DbPool,
        before_commit: impl Fn(&rusqlite::Connection, &str) + Send + Sync + 'static,
    ) -> Arc<dyn FacilitatorStore> {
        Arc::new(Self {
            inner: SqliteStore::new(pool.clone()),
            pool,
            before_commit: Box::new(before_commit),
        })
    }

    fn run_hook(&self, thread_id: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        (self.before_commit)(&conn, thread_id);
        Ok(())
    }
}

#[async_trait]
impl FacilitatorStore for HookedStore {
    async fn get_thread(&self, thread_id: &str) -> Result<ThreadConfig, StoreError> {
        self.inner.get_thread(thread_id).await
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, StoreError> {
        self.inner.get_message(message_id).await
    }

    async fn count_user_messages_since(
        &self,
        thread_id: &str,
        since: Option<&str>,
    ) -> Result<u64, StoreError> {
        self.inner.count_user_messages_since(thread_id, since).await
    }

    async fn recent_user_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        self.inner.recent_user_messages(thread_id, limit).await
    }

    async fn create_facilitator_message(
        &self,
        message: NewFacilitatorMessage,
    ) -> Result<Message, StoreError> {
        self.inner.create_facilitator_message(message).await
    }

    async fn commit_summary(
        &self,
        message: NewFacilitatorMessage,
        expected_revision: u64,
        state: &ConversationState,
        last_summary_at: &str,
    ) -> Result<Option<Message>, StoreError> {
        self.run_hook(&message.thread_id)?;
        self.inner
            .commit_summary(message, expected_revision, state, last_summary_at)
            .await
    }

    async fn commit_fact_check(
        &self,
        message: NewFacilitatorMessage,
        record: NewVerdictRecord,
    ) -> Result<Message, StoreError> {
        self.run_hook(&message.thread_id)?;
        self.inner.commit_fact_check(message, record).await
    }
}

/// A hook that applies a competing summary the first `times` commits.
fn competing_writer(times: u32) -> impl Fn(&rusqlite::Connection, &str) + Send + Sync + 'static {
    let remaining = Mutex::new(times);
    move |conn: &rusqlite::Connection, thread_id: &str| {
        let mut remaining = remaining.lock().unwrap();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        let current = agora_threads::get_thread(conn, thread_id).unwrap();
        let competing = current.state.with_summary(
            &Summary {
                topic: "A competing summary".to_string(),
                ..Summary::default()
            },
            "2000-01-01 00:00:00.000",
        );
        assert!(agora_threads::update_conversation_state(
            conn,
            thread_id,
            current.state.revision,
            &competing,
            "2000-01-01 00:00:00.000",
        )
        .unwrap());
    }
}

#[tokio::test]
async fn concurrent_state_update_is_retried_once() {
    let h = harness_with_store(&[SUMMARY_REPLY], vec![], |pool| {
        HookedStore::wrap(pool, competing_writer(1))
    });
    h.create_thread(InterventionLevel::Balanced, 15);
    h.post("m-1", "Alice", "Can someone summarize?");

    let report = h
        .orchestrator
        .handle_explicit_request("t-1", Some(ActionKind::Summary), ExplicitRequestContext::default())
        .await;
    assert!(report.intervened, "{report:?}");

    let thread = h.thread();
    assert_eq!(thread.state.revision, 2);
    assert_eq!(
        thread.state.topic.as_deref(),
        Some("Planning the spring retreat")
    );
    assert_eq!(h.facilitator_messages().len(), 1);
}

#[tokio::test]
async fn persistent_state_conflict_writes_no_summary_message() {
    let h = harness_with_store(&[SUMMARY_REPLY], vec![], |pool| {
        HookedStore::wrap(pool, competing_writer(2))
    });
    h.create_thread(InterventionLevel::Balanced, 15);
    h.post("m-1", "Alice", "Can someone summarize?");

    let report = h
        .orchestrator
        .handle_explicit_request("t-1", Some(ActionKind::Summary), ExplicitRequestContext::default())
        .await;
    assert!(!report.intervened);
    assert_eq!(
        report.error.as_deref(),
        Some("conversation state of thread t-1 kept changing during the update")
    );

    assert!(h.facilitator_messages().is_empty());
    let thread = h.thread();
    assert_eq!(thread.state.topic.as_deref(), Some("A competing summary"));
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn failed_claim_write_leaves_no_fact_check_message() {
    let reply = r#"{"status": "uncertain", "confidence": 0.4, "explanation": "Unclear."}"#;
    let h = harness_with_store(&[reply], vec![], |pool| {
        HookedStore::wrap(pool, |conn: &rusqlite::Connection, _: &str| {
            conn.execute_batch("DROP TABLE IF EXISTS claims;").unwrap();
        })
    });
    h.create_thread(InterventionLevel::Balanced, 15);
    let target = h.post("m-1", "Alice", "Coffee cures cancer.");

    let report = h
        .orchestrator
        .handle_event(
            "t-1",
            EventContext::Reaction {
                emoji: VERIFY_EMOJI.to_string(),
                message_id: target.message_id.clone(),
            },
        )
        .await;
    assert!(!report.intervened);
    assert_eq!(report.action, ActionKind::FactCheck);
    assert!(report.error.is_some());

    assert!(h.facilitator_messages().is_empty());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn messages_posted_during_summary_count_toward_the_next_one() {
    let h = harness(&[SUMMARY_REPLY], vec![]);
    h.create_thread(InterventionLevel::Balanced, 15);
    let summarized = h.post("m-1", "Alice", "Shall we pick a date?");

    let report = h
        .orchestrator
        .handle_explicit_request("t-1", Some(ActionKind::Summary), ExplicitRequestContext::default())
        .await;
    assert!(report.intervened, "{report:?}");
    let thread = h.thread();
    assert_eq!(
        thread.last_summary_at.as_deref(),
        Some(summarized.created_at.as_str())
    );

    // Stamped just after the summarized message, as if posted while the
    // model was still running.
    let conn = h.pool.get().expect("connection");
    conn.execute(
        "INSERT INTO messages (thread_id, message_id, author_id, author_name, kind, content, created_at)
         VALUES ('t-1', 'm-late', 'bob', 'Bob', 'user', 'Late reply', ?1)",
        [format!("{}1", summarized.created_at)],
    )
    .expect("insert late message");
    assert_eq!(
        h.store
            .count_user_messages_since("t-1", thread.last_summary_at.as_deref())
            .await
            .expect("count"),
        1
    );
}

#[tokio::test]
async fn explicit_observation_notes_unresolved_points() {
    let h = harness(&[SUMMARY_REPLY], vec![]);
    h.create_thread(InterventionLevel::Balanced, 15);
    h.post("m-1", "Alice", "April or May?");

    let empty = h
        .orchestrator
        .handle_explicit_request(
            "t-1",
            Some(ActionKind::Observation),
            ExplicitRequestContext::default(),
        )
        .await;
    assert!(!empty.intervened);
    assert_eq!(
        empty.error.as_deref(),
        Some("thread t-1 has nothing to observe yet")
    );
    assert!(h.facilitator_messages().is_empty());

    let summary = h
        .orchestrator
        .handle_explicit_request("t-1", Some(ActionKind::Summary), ExplicitRequestContext::default())
        .await;
    assert!(summary.intervened, "{summary:?}");

    let report = h
        .orchestrator
        .handle_explicit_request(
            "t-1",
            Some(ActionKind::Observation),
            ExplicitRequestContext::default(),
        )
        .await;
    assert!(report.intervened, "{report:?}");
    let note = h
        .facilitator_messages()
        .into_iter()
        .find(|m| m.kind == MessageKind::LlmIntervention)
        .expect("observation message");
    assert!(note.content.contains("Disagreements:\n- Which weekend"));
    assert!(!note.content.contains("explicit"));
}
