//! The resumable resolution state machine tying the flow together.
//!
//! One controller instance owns one scan-to-dispense attempt: parse, verify,
//! and either hand off to the dispense stage or park the intent across the
//! sign-in redirect. Every new scan starts a new sequence; continuations of
//! a superseded sequence apply no transition, so a stale validation can
//! never overwrite a newer scan's outcome.

use crate::flow::auth::{AuthProvider, AuthStatus};
use crate::flow::intent::{KeyValueStore, PendingIntent, PendingIntentStore};
use crate::flow::parser::QrParser;
use crate::flow::validator::{ResolveFailure, ValidateMachine, VerifiedMachine};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Terminal error categories surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowErrorKind {
    /// Malformed or absent payload; user-fixable by rescanning.
    MissingParameters,
    /// Backend rejected the reference; never retried automatically.
    InvalidQr(String),
    /// Transport failure; eligible for user-initiated retry.
    Network(String),
}

impl FlowErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            FlowErrorKind::MissingParameters => "missing_parameters",
            FlowErrorKind::InvalidQr(_) => "invalid_qr",
            FlowErrorKind::Network(_) => "network",
        }
    }
}

/// States of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Checking,
    /// Verified, waiting on the auth status to resolve.
    Validated(VerifiedMachine),
    /// Intent persisted; the only remaining side effect is the redirect.
    AwaitingAuth { sign_in_url: String },
    /// Handed off to the dispense stage.
    Routed {
        machine_id: String,
        location: String,
        from_qr: bool,
    },
    Error(FlowErrorKind),
}

/// Whether a transition was applied or discarded as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Applied(FlowState),
    /// A newer scan superseded this sequence; nothing was changed.
    Superseded,
}

pub struct FlowController<V: ValidateMachine, A: AuthProvider, S: KeyValueStore> {
    parser: QrParser,
    validator: V,
    auth: A,
    intents: PendingIntentStore<S>,
    state: Mutex<FlowState>,
    /// Sequence counter; only the latest sequence may commit transitions.
    active: AtomicU64,
}

impl<V: ValidateMachine, A: AuthProvider, S: KeyValueStore> FlowController<V, A, S> {
    pub fn new(parser: QrParser, validator: V, auth: A, intents: PendingIntentStore<S>) -> Self {
        Self {
            parser,
            validator,
            auth,
            intents,
            state: Mutex::new(FlowState::Checking),
            active: AtomicU64::new(0),
        }
    }

    /// Current state, cloned.
    pub async fn state(&self) -> FlowState {
        self.state.lock().await.clone()
    }

    pub fn intents(&self) -> &PendingIntentStore<S> {
        &self.intents
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Runs one full resolution: parse, verify, route.
    ///
    /// `return_url` is where the hosted sign-in should land the user again,
    /// normally the resolver page with the original payload.
    pub async fn resolve(&self, raw_scan: &str, return_url: &str) -> ResolveOutcome {
        let seq = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.commit(seq, FlowState::Checking).await {
            return ResolveOutcome::Superseded;
        }

        let reference = self.parser.parse(raw_scan);
        if !reference.is_parsed() {
            return self
                .commit_outcome(seq, FlowState::Error(FlowErrorKind::MissingParameters))
                .await;
        }

        let machine = match self.validator.verify(&reference).await {
            Ok(machine) => machine,
            Err(ResolveFailure::MissingParameters) => {
                return self
                    .commit_outcome(seq, FlowState::Error(FlowErrorKind::MissingParameters))
                    .await;
            }
            Err(ResolveFailure::Network(message)) => {
                return self
                    .commit_outcome(seq, FlowState::Error(FlowErrorKind::Network(message)))
                    .await;
            }
            Err(ResolveFailure::InvalidOrExpired(message))
            | Err(ResolveFailure::NotFoundOrInactive(message)) => {
                return self
                    .commit_outcome(seq, FlowState::Error(FlowErrorKind::InvalidQr(message)))
                    .await;
            }
        };

        if !self.commit(seq, FlowState::Validated(machine.clone())).await {
            return ResolveOutcome::Superseded;
        }

        self.route_validated(seq, machine, return_url).await
    }

    /// Re-runs the routing step once the auth status resolves.
    ///
    /// The `Validated` state is a suspension point, not a failure: the
    /// identity provider may still be initializing when validation lands.
    pub async fn auth_status_changed(&self, return_url: &str) -> ResolveOutcome {
        let seq = self.active.load(Ordering::SeqCst);
        let current = self.state.lock().await.clone();
        match current {
            FlowState::Validated(machine) => self.route_validated(seq, machine, return_url).await,
            other => ResolveOutcome::Applied(other),
        }
    }

    async fn route_validated(
        &self,
        seq: u64,
        machine: VerifiedMachine,
        return_url: &str,
    ) -> ResolveOutcome {
        match self.auth.status() {
            AuthStatus::Loading => ResolveOutcome::Applied(FlowState::Validated(machine)),
            AuthStatus::SignedOut => {
                let intent = PendingIntent::new(
                    machine.machine_id.clone(),
                    machine.display_location.clone(),
                );
                if let Err(error) = self.intents.save(&intent).await {
                    tracing::error!("Failed to persist pending intent: {}", error);
                    return self
                        .commit_outcome(
                            seq,
                            FlowState::Error(FlowErrorKind::Network(error.to_string())),
                        )
                        .await;
                }
                self.commit_outcome(
                    seq,
                    FlowState::AwaitingAuth {
                        sign_in_url: self.auth.sign_in_url(return_url),
                    },
                )
                .await
            }
            AuthStatus::SignedIn => {
                self.commit_outcome(
                    seq,
                    FlowState::Routed {
                        machine_id: machine.machine_id,
                        location: machine.display_location,
                        from_qr: true,
                    },
                )
                .await
            }
        }
    }

    async fn commit(&self, seq: u64, next: FlowState) -> bool {
        let mut state = self.state.lock().await;
        if self.active.load(Ordering::SeqCst) != seq {
            return false;
        }
        *state = next;
        true
    }

    async fn commit_outcome(&self, seq: u64, next: FlowState) -> ResolveOutcome {
        if self.commit(seq, next.clone()).await {
            ResolveOutcome::Applied(next)
        } else {
            ResolveOutcome::Superseded
        }
    }
}

/// The pending-dispense watcher, run once per application mount.
///
/// When a session is confirmed and the store holds an intent, the intent is
/// consumed and the flow routes straight to the dispense stage. The machine
/// was already verified before being stored, so no second validation happens
/// here; the store's take-and-clear atomicity keeps concurrent mounts from
/// double-consuming.
pub async fn resume_pending_dispense<A: AuthProvider, S: KeyValueStore>(
    auth: &A,
    intents: &PendingIntentStore<S>,
) -> Option<FlowState> {
    if auth.status() != AuthStatus::SignedIn {
        return None;
    }

    let intent = intents.take_and_clear().await?;
    tracing::info!(
        "Resuming pending dispense for machine {} at {}",
        intent.machine_id,
        intent.display_location
    );

    Some(FlowState::Routed {
        machine_id: intent.machine_id,
        location: intent.display_location,
        from_qr: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::intent::MemoryStore;
    use crate::flow::parser::MachineReference;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::RwLock;
    use std::sync::atomic::AtomicUsize;
    use url::Url;

    struct StubValidator {
        responses: Vec<Result<VerifiedMachine, ResolveFailure>>,
        calls: AtomicUsize,
        /// When set, the first call waits here before answering.
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl StubValidator {
        fn ok(machine_id: &str, location: &str) -> Self {
            Self {
                responses: vec![Ok(VerifiedMachine {
                    machine_id: machine_id.to_string(),
                    display_location: location.to_string(),
                })],
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn failing(failure: ResolveFailure) -> Self {
            Self {
                responses: vec![Err(failure)],
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValidateMachine for StubValidator {
        async fn verify(
            &self,
            _reference: &MachineReference,
        ) -> Result<VerifiedMachine, ResolveFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            self.responses
                .get(call.min(self.responses.len() - 1))
                .cloned()
                .unwrap_or(Err(ResolveFailure::Network("exhausted".to_string())))
        }
    }

    struct TestAuth {
        status: RwLock<AuthStatus>,
    }

    impl TestAuth {
        fn new(status: AuthStatus) -> Self {
            Self {
                status: RwLock::new(status),
            }
        }

        fn set(&self, status: AuthStatus) {
            *self.status.write().unwrap() = status;
        }
    }

    #[async_trait]
    impl AuthProvider for TestAuth {
        fn status(&self) -> AuthStatus {
            *self.status.read().unwrap()
        }

        async fn bearer_token(&self) -> anyhow::Result<String> {
            match self.status() {
                AuthStatus::SignedIn => Ok("test-token".to_string()),
                _ => Err(anyhow!("no active session")),
            }
        }

        fn sign_in_url(&self, return_url: &str) -> String {
            format!("https://auth.test/sign-in?return_url={}", return_url)
        }
    }

    fn parser() -> QrParser {
        QrParser::new(Url::parse("https://kiosk.test").unwrap())
    }

    fn controller(
        validator: StubValidator,
        auth: Arc<TestAuth>,
    ) -> FlowController<StubValidator, Arc<TestAuth>, MemoryStore> {
        FlowController::new(
            parser(),
            validator,
            auth,
            PendingIntentStore::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn unparseable_payload_is_a_terminal_missing_parameters_error() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedIn));
        let controller = controller(StubValidator::ok("007", "plaza"), auth);

        let outcome = controller.resolve("", "/kiosk").await;
        assert_eq!(
            outcome,
            ResolveOutcome::Applied(FlowState::Error(FlowErrorKind::MissingParameters))
        );
        // The validator is never consulted for an unparsed payload.
        assert_eq!(controller.validator.call_count(), 0);
    }

    #[tokio::test]
    async fn rejected_reference_maps_to_invalid_qr() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedIn));
        let controller = controller(
            StubValidator::failing(ResolveFailure::InvalidOrExpired("EXPIRED".to_string())),
            auth,
        );

        let outcome = controller.resolve("?m=007&sig=stale", "/kiosk").await;
        assert_eq!(
            outcome,
            ResolveOutcome::Applied(FlowState::Error(FlowErrorKind::InvalidQr(
                "EXPIRED".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn transport_failure_maps_to_network() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedIn));
        let controller = controller(
            StubValidator::failing(ResolveFailure::Network("timeout".to_string())),
            auth,
        );

        let outcome = controller.resolve("?m=007&sig=s", "/kiosk").await;
        match outcome {
            ResolveOutcome::Applied(FlowState::Error(FlowErrorKind::Network(_))) => {}
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn signed_in_user_routes_directly() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedIn));
        let controller = controller(StubValidator::ok("007", "Plaza Central"), auth);

        let outcome = controller.resolve("?m=007&sig=good", "/kiosk").await;
        assert_eq!(
            outcome,
            ResolveOutcome::Applied(FlowState::Routed {
                machine_id: "007".to_string(),
                location: "Plaza Central".to_string(),
                from_qr: true,
            })
        );
    }

    #[tokio::test]
    async fn signed_out_user_parks_the_intent_and_awaits_auth() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedOut));
        let controller = controller(StubValidator::ok("007", "Plaza Central"), auth);

        let outcome = controller.resolve("?m=007&sig=good", "/kiosk?m=007").await;
        match outcome {
            ResolveOutcome::Applied(FlowState::AwaitingAuth { sign_in_url }) => {
                assert!(sign_in_url.contains("return_url=/kiosk?m=007"));
            }
            other => panic!("expected AwaitingAuth, got {:?}", other),
        }

        let parked = controller.intents().take_and_clear().await.unwrap();
        assert_eq!(parked.machine_id, "007");
        assert_eq!(parked.display_location, "Plaza Central");
    }

    #[tokio::test]
    async fn loading_auth_suspends_in_validated_until_status_resolves() {
        let auth = Arc::new(TestAuth::new(AuthStatus::Loading));
        let controller = controller(StubValidator::ok("007", "plaza"), auth.clone());

        let outcome = controller.resolve("?m=007&sig=good", "/kiosk").await;
        match outcome {
            ResolveOutcome::Applied(FlowState::Validated(machine)) => {
                assert_eq!(machine.machine_id, "007");
            }
            other => panic!("expected Validated, got {:?}", other),
        }

        auth.set(AuthStatus::SignedIn);
        let outcome = controller.auth_status_changed("/kiosk").await;
        assert_eq!(
            outcome,
            ResolveOutcome::Applied(FlowState::Routed {
                machine_id: "007".to_string(),
                location: "plaza".to_string(),
                from_qr: true,
            })
        );
        // One verification total; routing after auth does not re-validate.
        assert_eq!(controller.validator.call_count(), 1);
    }

    #[tokio::test]
    async fn watcher_consumes_the_intent_exactly_once_without_revalidating() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedOut));
        let controller = controller(StubValidator::ok("007", "Plaza Central"), auth.clone());
        controller.resolve("?m=007&sig=good", "/kiosk").await;
        assert_eq!(controller.validator.call_count(), 1);

        // Simulate the redirect round-trip: auth resolves, a fresh mount runs
        // the watcher against the same durable store.
        auth.set(AuthStatus::SignedIn);
        let resumed = resume_pending_dispense(controller.auth(), controller.intents()).await;
        assert_eq!(
            resumed,
            Some(FlowState::Routed {
                machine_id: "007".to_string(),
                location: "Plaza Central".to_string(),
                from_qr: true,
            })
        );

        // Second mount: the slot is empty, nothing to resume.
        assert!(
            resume_pending_dispense(controller.auth(), controller.intents())
                .await
                .is_none()
        );
        // And the validator was never called a second time.
        assert_eq!(controller.validator.call_count(), 1);
    }

    #[tokio::test]
    async fn watcher_is_inert_while_signed_out_or_loading() {
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedOut));
        let intents = PendingIntentStore::new(MemoryStore::new());
        intents
            .save(&PendingIntent::new("007", "plaza"))
            .await
            .unwrap();

        assert!(resume_pending_dispense(&auth, &intents).await.is_none());
        auth.set(AuthStatus::Loading);
        assert!(resume_pending_dispense(&auth, &intents).await.is_none());

        // The intent is still parked for when the session resolves.
        auth.set(AuthStatus::SignedIn);
        assert!(resume_pending_dispense(&auth, &intents).await.is_some());
    }

    #[tokio::test]
    async fn superseded_scan_applies_no_transition() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let validator = StubValidator {
            responses: vec![
                Ok(VerifiedMachine {
                    machine_id: "FIRST".to_string(),
                    display_location: "old".to_string(),
                }),
                Ok(VerifiedMachine {
                    machine_id: "SECOND".to_string(),
                    display_location: "new".to_string(),
                }),
            ],
            calls: AtomicUsize::new(0),
            gate: Some(gate.clone()),
        };
        let auth = Arc::new(TestAuth::new(AuthStatus::SignedIn));
        let controller = Arc::new(controller_with(validator, auth));

        // First scan blocks inside validation.
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.resolve("?m=FIRST&sig=a", "/kiosk").await })
        };
        while controller.validator.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        // Second scan completes while the first is still in flight.
        let second = controller.resolve("?m=SECOND&sig=b", "/kiosk").await;
        match &second {
            ResolveOutcome::Applied(FlowState::Routed { machine_id, .. }) => {
                assert_eq!(machine_id, "SECOND");
            }
            other => panic!("expected routed second scan, got {:?}", other),
        }

        // Release the first scan; its result must be discarded.
        gate.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first, ResolveOutcome::Superseded);

        match controller.state().await {
            FlowState::Routed { machine_id, .. } => assert_eq!(machine_id, "SECOND"),
            other => panic!("stale scan overwrote the state: {:?}", other),
        }
    }

    fn controller_with(
        validator: StubValidator,
        auth: Arc<TestAuth>,
    ) -> FlowController<StubValidator, Arc<TestAuth>, MemoryStore> {
        FlowController::new(
            parser(),
            validator,
            auth,
            PendingIntentStore::new(MemoryStore::new()),
        )
    }
}
