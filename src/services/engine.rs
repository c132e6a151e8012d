//! The debate engine: a per-round phase state machine processing one action
//! at a time.
//!
//! The engine is the only writer to the session store. Each action is
//! validated against the session's current phase before any side effect;
//! persona output flows through the conflict rules, and lifecycle events are
//! pushed to the caller in strict order. On an escalated oracle failure the
//! session's phase and round are restored to their pre-action values so the
//! caller can retry the same action.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DebateError, DebateResult};
use crate::domain::models::{
    Action, ActionKind, ConflictChoice, ConflictEvent, ConflictRule, DebateConfig, DebateEvent,
    DebatePhase, Message, Role, Session, SessionStatus, MAX_ROUNDS,
};
use crate::domain::ports::{DebateStore, OracleError, RoleOracle};
use crate::services::convergence::{check_convergence, extract_hypotheses};
use crate::services::history::build_round_history;
use crate::services::invoker::{generate_fallback_grounder, regeneration_note, PersonaInvoker};
use crate::services::personas::{Persona, PersonaContext, FORCE_OPPOSITION_NOTE};
use crate::services::rules::{
    detect_alternative_hypothesis, detect_consensus_alert, detect_tech_escape,
    validate_falsification_block,
};

pub struct DebateEngine {
    store: Arc<dyn DebateStore>,
    invoker: PersonaInvoker,
    config: DebateConfig,
    /// Per-session serialization: two actions against one session would
    /// corrupt round/phase sequencing.
    session_locks: Mutex<HashMap<uuid::Uuid, Arc<Mutex<()>>>>,
}

fn escalate(err: OracleError) -> DebateError {
    match err {
        OracleError::Transient(msg) => DebateError::OracleTransientFailure(msg),
        OracleError::Hard(msg) => DebateError::OracleHardFailure(msg),
    }
}

impl DebateEngine {
    pub fn new(
        store: Arc<dyn DebateStore>,
        oracle: Arc<dyn RoleOracle>,
        config: DebateConfig,
    ) -> Self {
        Self {
            store,
            invoker: PersonaInvoker::new(oracle),
            config,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Processes one action to completion, pushing lifecycle events as the
    /// phase's work unfolds. Invalid action/phase combinations fail with
    /// [`DebateError::PhaseViolation`] before any side effect.
    #[instrument(skip(self, events), fields(session_id = %action.session_id, action = ?action.kind))]
    pub async fn process(
        &self,
        action: Action,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        let lock = self.session_lock(action.session_id).await;
        let _guard = lock.lock().await;

        let session = self
            .store
            .get_session(action.session_id)
            .await?
            .ok_or(DebateError::NotFound(action.session_id))?;

        let result = match action.kind {
            ActionKind::StartRound | ActionKind::NextRound => {
                self.handle_start_round(session, action.kind, events).await
            }
            ActionKind::UserConfirm => self.handle_user_confirm(session, &action, events).await,
            ActionKind::ConflictChoice => {
                self.handle_conflict_choice(session, &action, events).await
            }
            ActionKind::UserResponse => self.handle_user_response(session, &action, events).await,
            ActionKind::EndSession => self.handle_end_session(session, events).await,
        };

        if let Err(err) = &result {
            warn!(error = %err, "action failed");
        }
        result
    }

    async fn session_lock(&self, id: uuid::Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Restores the pre-action session snapshot, surfaces a terminal error
    /// event, and hands back the escalated failure.
    async fn restore_and_escalate(
        &self,
        snapshot: &Session,
        events: &UnboundedSender<DebateEvent>,
        err: OracleError,
    ) -> DebateError {
        if let Err(store_err) = self.store.update_session(snapshot).await {
            warn!(error = %store_err, "failed to restore session after oracle failure");
        }
        let err = escalate(err);
        let _ = events.send(DebateEvent::Error { content: err.to_string() });
        err
    }

    async fn set_phase(
        &self,
        session: &mut Session,
        phase: DebatePhase,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        session.phase = phase;
        self.store.update_session(session).await?;
        let _ = events
            .send(DebateEvent::PhaseChange { phase, round: Some(session.current_round) });
        Ok(())
    }

    async fn round_history(&self, session: &Session) -> DebateResult<String> {
        let messages = self.store.list_messages(session.id).await?;
        Ok(build_round_history(&messages, self.config.history_window_rounds))
    }

    async fn role_content(
        &self,
        session: &Session,
        round: u32,
        role: Role,
        last: bool,
    ) -> DebateResult<String> {
        let messages = self.store.messages_by_role(session.id, round, role).await?;
        let picked = if last { messages.last() } else { messages.first() };
        Ok(picked.map(|m| m.content.clone()).unwrap_or_default())
    }

    // ── start_round / next_round ──

    async fn handle_start_round(
        &self,
        mut session: Session,
        kind: ActionKind,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        let expected = match kind {
            ActionKind::StartRound => DebatePhase::Idle,
            _ => DebatePhase::RoundComplete,
        };
        if session.phase != expected {
            return Err(DebateError::phase_violation(
                kind,
                session.phase,
                format!("a round can only open from the {} phase", expected.as_str()),
            ));
        }
        if !session.can_start_round() {
            return Err(DebateError::phase_violation(
                kind,
                session.phase,
                format!("session is completed or reached the {MAX_ROUNDS}-round ceiling"),
            ));
        }

        let snapshot = session.clone();
        session.current_round += 1;
        info!(round = session.current_round, "opening round");
        self.set_phase(&mut session, DebatePhase::Architect, events).await?;

        let ctx = PersonaContext {
            user_input: session.idea.clone(),
            round_history: self.round_history(&session).await?,
            ..Default::default()
        };
        let architect_output =
            match self.invoker.stream_role(Persona::Architect, &ctx, None, events).await {
                Ok(text) => text,
                Err(err) => return Err(self.restore_and_escalate(&snapshot, events, err).await),
            };
        self.store
            .append_message(&Message::new(
                session.id,
                session.current_round,
                Role::Architect,
                architect_output,
            ))
            .await?;

        self.set_phase(&mut session, DebatePhase::UserConfirm, events).await?;
        let _ = events.send(DebateEvent::Done);
        Ok(())
    }

    // ── user_confirm ──

    async fn handle_user_confirm(
        &self,
        mut session: Session,
        action: &Action,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        if session.phase != DebatePhase::UserConfirm {
            return Err(DebateError::phase_violation(
                action.kind,
                session.phase,
                "the architect's problem definition has not been presented yet",
            ));
        }

        let snapshot = session.clone();
        let round = session.current_round;
        let confirmation = action.content.clone().unwrap_or_default();
        self.store
            .append_message(
                &Message::new(session.id, round, Role::User, confirmation.clone())
                    .with_metadata(r#"{"subtype":"confirm"}"#),
            )
            .await?;

        self.set_phase(&mut session, DebatePhase::Attacking, events).await?;

        let ctx = PersonaContext {
            user_input: session.idea.clone(),
            architect_output: Some(
                self.role_content(&session, round, Role::Architect, false).await?,
            ),
            user_response: Some(confirmation),
            round_history: self.round_history(&session).await?,
            ..Default::default()
        };

        let assassin_output =
            match self.invoker.stream_role(Persona::Assassin, &ctx, None, events).await {
                Ok(text) => text,
                Err(err) => return Err(self.restore_and_escalate(&snapshot, events, err).await),
            };
        self.store
            .append_message(&Message::new(session.id, round, Role::Assassin, &assassin_output))
            .await?;

        let ghost_output =
            match self.invoker.stream_role(Persona::UserGhost, &ctx, None, events).await {
                Ok(text) => text,
                Err(err) => return Err(self.restore_and_escalate(&snapshot, events, err).await),
            };
        self.store
            .append_message(&Message::new(session.id, round, Role::UserGhost, &ghost_output))
            .await?;

        self.set_phase(&mut session, DebatePhase::ConflictCheck, events).await?;
        self.detect_attack_conflicts(&session, &assassin_output, &ghost_output, events).await?;

        self.set_phase(&mut session, DebatePhase::UserResponse, events).await?;
        let _ = events.send(DebateEvent::Done);
        Ok(())
    }

    /// Rules 1 and 2 over the freshly produced attack outputs. Assassin is
    /// checked first for rule 1; if both challengers reframe, the assassin's
    /// finding wins.
    async fn detect_attack_conflicts(
        &self,
        session: &Session,
        assassin_output: &str,
        ghost_output: &str,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        let round = session.current_round;

        let alternative = detect_alternative_hypothesis(assassin_output, Role::Assassin)
            .or_else(|| detect_alternative_hypothesis(ghost_output, Role::UserGhost));
        if let Some(alt) = alternative {
            info!(source = alt.source.as_str(), "alternative hypothesis detected");
            self.store
                .append_conflict(&ConflictEvent::new(
                    session.id,
                    round,
                    ConflictRule::AlternativeHypothesis,
                    format!("{}: {}", alt.source.history_label(), alt.content),
                ))
                .await?;
            let _ = events.send(DebateEvent::ConflictAlert {
                conflict_type: ConflictRule::AlternativeHypothesis,
                detail: Some(serde_json::to_string(&alt)?),
            });
        }

        let previous_assassin = if round >= 2 {
            self.store
                .messages_by_role(session.id, round - 1, Role::Assassin)
                .await?
                .last()
                .map(|m| m.content.clone())
        } else {
            None
        };
        if detect_consensus_alert(assassin_output, ghost_output, previous_assassin.as_deref()) {
            info!("consensus alert: challengers are agreeing");
            self.store
                .append_conflict(&ConflictEvent::new(
                    session.id,
                    round,
                    ConflictRule::ConsensusAlert,
                    "All roles converging",
                ))
                .await?;
            let _ = events.send(DebateEvent::ConflictAlert {
                conflict_type: ConflictRule::ConsensusAlert,
                detail: None,
            });
        }
        Ok(())
    }

    // ── conflict_choice ──

    async fn handle_conflict_choice(
        &self,
        session: Session,
        action: &Action,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        let pending = self
            .store
            .list_conflicts(session.id)
            .await?
            .into_iter()
            .filter(|c| !c.is_resolved())
            .next_back();
        let Some(pending) = pending else {
            return Err(DebateError::phase_violation(
                action.kind,
                session.phase,
                "no unresolved conflict event is pending",
            ));
        };

        let snapshot = session.clone();
        let round = session.current_round;
        let resolution = match (&action.content, action.choice) {
            (Some(content), _) => content.clone(),
            (None, Some(choice)) => choice.as_str().to_string(),
            (None, None) => String::new(),
        };

        if !resolution.is_empty() {
            let metadata = serde_json::json!({
                "subtype": "conflict_choice",
                "choice": action.choice.map(ConflictChoice::as_str),
            });
            self.store
                .append_message(
                    &Message::new(session.id, round, Role::User, resolution.clone())
                        .with_metadata(metadata.to_string()),
                )
                .await?;
            self.store.resolve_conflict(pending.id, &resolution).await?;
        }

        if action.choice == Some(ConflictChoice::ForceOpposition) {
            let ctx = PersonaContext {
                user_input: session.idea.clone(),
                architect_output: Some(
                    self.role_content(&session, round, Role::Architect, false).await?,
                ),
                user_response: action.content.clone(),
                round_history: self.round_history(&session).await?,
                ..Default::default()
            };
            let forced = match self
                .invoker
                .stream_role(
                    Persona::Assassin,
                    &ctx,
                    Some(FORCE_OPPOSITION_NOTE.to_string()),
                    events,
                )
                .await
            {
                Ok(text) => text,
                Err(err) => return Err(self.restore_and_escalate(&snapshot, events, err).await),
            };
            self.store
                .append_message(
                    &Message::new(session.id, round, Role::Assassin, forced)
                        .with_metadata(r#"{"forced":true}"#),
                )
                .await?;
            let mut regenerated = ConflictEvent::new(
                session.id,
                round,
                ConflictRule::ForcedOpposition,
                "assassin regenerated under forcing instruction",
            );
            regenerated.user_choice = Some(resolution);
            self.store.append_conflict(&regenerated).await?;
        }

        // Resolution does not advance the phase.
        let _ = events.send(DebateEvent::PhaseChange {
            phase: session.phase,
            round: Some(round),
        });
        let _ = events.send(DebateEvent::Done);
        Ok(())
    }

    // ── user_response ──

    async fn handle_user_response(
        &self,
        mut session: Session,
        action: &Action,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        if session.phase != DebatePhase::UserResponse {
            return Err(DebateError::phase_violation(
                action.kind,
                session.phase,
                "the attack phase has not finished yet",
            ));
        }

        let round = session.current_round;
        let user_response = action.content.clone().unwrap_or_default();
        self.store
            .append_message(
                &Message::new(session.id, round, Role::User, user_response.clone())
                    .with_metadata(r#"{"subtype":"response"}"#),
            )
            .await?;

        if detect_tech_escape(&user_response) {
            info!("tech escape detected in user response");
            self.store
                .append_conflict(&ConflictEvent::new(
                    session.id,
                    round,
                    ConflictRule::TechEscape,
                    "User response focuses on tech capability",
                ))
                .await?;
            let _ = events.send(DebateEvent::ConflictAlert {
                conflict_type: ConflictRule::TechEscape,
                detail: None,
            });
        }

        self.set_phase(&mut session, DebatePhase::Grounding, events).await?;

        let architect_output = self.role_content(&session, round, Role::Architect, false).await?;
        let assassin_output = self.role_content(&session, round, Role::Assassin, true).await?;
        let ghost_output = self.role_content(&session, round, Role::UserGhost, false).await?;
        let confirm_content = self.role_content(&session, round, Role::User, false).await?;

        let ctx = PersonaContext {
            user_input: user_response,
            architect_output: Some(architect_output.clone()),
            assassin_output: Some(assassin_output.clone()),
            user_ghost_output: Some(ghost_output),
            user_response: Some(confirm_content),
            round_history: self.round_history(&session).await?,
        };

        let grounder_output =
            self.invoke_grounder(&ctx, &architect_output, &assassin_output, events).await?;
        self.store
            .append_message(&Message::new(session.id, round, Role::Grounder, &grounder_output))
            .await?;

        if round >= 2 {
            let previous = self.role_content(&session, round - 1, Role::Grounder, true).await?;
            let report = check_convergence(
                &extract_hypotheses(&grounder_output),
                &extract_hypotheses(&previous),
                self.config.convergence_threshold,
            );
            info!(score = report.score, converged = report.converged, "convergence check");
            let _ = events.send(DebateEvent::ConvergenceCheck {
                converged: report.converged,
                detail: format!("score={:.2}", report.score),
            });
        }

        self.set_phase(&mut session, DebatePhase::RoundComplete, events).await?;

        if round >= MAX_ROUNDS {
            session.status = SessionStatus::Completed;
            self.store.update_session(&session).await?;
            info!("session completed after final round");
        }

        let _ = events.send(DebateEvent::Done);
        Ok(())
    }

    /// Grounder synthesis with the two degradation branches: one
    /// validation-driven regeneration, and the deterministic local fallback
    /// on oracle failure.
    async fn invoke_grounder(
        &self,
        ctx: &PersonaContext,
        architect_output: &str,
        assassin_output: &str,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<String> {
        let output = match self.invoker.stream_role(Persona::Grounder, ctx, None, events).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "grounder failed, generating fallback synthesis");
                let fallback = generate_fallback_grounder(architect_output, assassin_output);
                let _ = events.send(DebateEvent::RoleComplete {
                    role: Role::Grounder,
                    content: fallback.clone(),
                });
                return Ok(fallback);
            }
        };

        if validate_falsification_block(&output) {
            return Ok(output);
        }

        let _ = events.send(DebateEvent::ConflictAlert {
            conflict_type: ConflictRule::FalsificationBlock,
            detail: Some("Missing falsification check, regenerating...".to_string()),
        });
        let note = regeneration_note(&output);
        let regenerated = match self.invoker.complete_role(Persona::Grounder, ctx, Some(note)).await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "regeneration failed, keeping invalid synthesis");
                return Ok(output);
            }
        };
        let _ = events.send(DebateEvent::RoleComplete {
            role: Role::Grounder,
            content: regenerated.clone(),
        });

        // At most one regeneration: a second failure is accepted as-is but
        // surfaced so the caller knows the synthesis is non-compliant.
        if !validate_falsification_block(&regenerated) {
            let _ = events.send(DebateEvent::ConflictAlert {
                conflict_type: ConflictRule::FalsificationBlock,
                detail: Some("Regenerated output still missing anchors, accepted as-is".to_string()),
            });
        }
        Ok(regenerated)
    }

    // ── end_session ──

    async fn handle_end_session(
        &self,
        mut session: Session,
        events: &UnboundedSender<DebateEvent>,
    ) -> DebateResult<()> {
        session.status = SessionStatus::Completed;
        session.phase = DebatePhase::Idle;
        self.store.update_session(&session).await?;
        info!("session ended");
        let _ = events.send(DebateEvent::PhaseChange { phase: DebatePhase::Idle, round: None });
        let _ = events.send(DebateEvent::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use crate::domain::ports::{OracleRequest, TokenStream};

    // In-memory store mirroring the sqlite repository's ordering contract.
    #[derive(Default)]
    struct MemoryStore {
        inner: StdMutex<MemoryInner>,
    }

    #[derive(Default)]
    struct MemoryInner {
        sessions: HashMap<Uuid, Session>,
        messages: Vec<Message>,
        conflicts: Vec<ConflictEvent>,
        next_message_id: i64,
        next_conflict_id: i64,
    }

    #[async_trait]
    impl DebateStore for MemoryStore {
        async fn create_session(&self, session: &Session) -> DebateResult<()> {
            self.inner.lock().unwrap().sessions.insert(session.id, session.clone());
            Ok(())
        }

        async fn get_session(&self, id: Uuid) -> DebateResult<Option<Session>> {
            Ok(self.inner.lock().unwrap().sessions.get(&id).cloned())
        }

        async fn update_session(&self, session: &Session) -> DebateResult<()> {
            self.inner.lock().unwrap().sessions.insert(session.id, session.clone());
            Ok(())
        }

        async fn list_sessions(&self) -> DebateResult<Vec<Session>> {
            Ok(self.inner.lock().unwrap().sessions.values().cloned().collect())
        }

        async fn delete_session(&self, id: Uuid) -> DebateResult<()> {
            self.inner.lock().unwrap().sessions.remove(&id);
            Ok(())
        }

        async fn append_message(&self, message: &Message) -> DebateResult<Message> {
            let mut inner = self.inner.lock().unwrap();
            inner.next_message_id += 1;
            let mut stored = message.clone();
            stored.id = inner.next_message_id;
            inner.messages.push(stored.clone());
            Ok(stored)
        }

        async fn list_messages(&self, session_id: Uuid) -> DebateResult<Vec<Message>> {
            let inner = self.inner.lock().unwrap();
            let mut msgs: Vec<Message> =
                inner.messages.iter().filter(|m| m.session_id == session_id).cloned().collect();
            msgs.sort_by_key(|m| (m.round, m.id));
            Ok(msgs)
        }

        async fn messages_by_role(
            &self,
            session_id: Uuid,
            round: u32,
            role: Role,
        ) -> DebateResult<Vec<Message>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .messages
                .iter()
                .filter(|m| m.session_id == session_id && m.round == round && m.role == role)
                .cloned()
                .collect())
        }

        async fn append_conflict(&self, event: &ConflictEvent) -> DebateResult<ConflictEvent> {
            let mut inner = self.inner.lock().unwrap();
            inner.next_conflict_id += 1;
            let mut stored = event.clone();
            stored.id = inner.next_conflict_id;
            inner.conflicts.push(stored.clone());
            Ok(stored)
        }

        async fn list_conflicts(&self, session_id: Uuid) -> DebateResult<Vec<ConflictEvent>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.conflicts.iter().filter(|c| c.session_id == session_id).cloned().collect())
        }

        async fn resolve_conflict(&self, event_id: i64, user_choice: &str) -> DebateResult<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(conflict) = inner.conflicts.iter_mut().find(|c| c.id == event_id) {
                conflict.user_choice = Some(user_choice.to_string());
            }
            Ok(())
        }
    }

    // Pops one scripted outcome per invocation, in order.
    struct ScriptedOracle {
        outputs: StdMutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedOracle {
        fn new(outputs: Vec<Result<&str, &str>>) -> Self {
            Self {
                outputs: StdMutex::new(
                    outputs
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
            }
        }

        fn next(&self) -> Result<String, OracleError> {
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("默认输出".to_string()))
                .map_err(OracleError::Hard)
        }
    }

    #[async_trait]
    impl RoleOracle for ScriptedOracle {
        async fn complete(&self, _request: OracleRequest) -> Result<String, OracleError> {
            self.next()
        }

        async fn stream(&self, _request: OracleRequest) -> Result<TokenStream, OracleError> {
            let full = self.next()?;
            let chunks: Vec<Result<String, OracleError>> =
                full.chars().map(|c| Ok(c.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    const VALID_GROUNDER: &str = "## 当前最强假设\n1. 中小团队的审查瓶颈真实存在\n\n## 本轮证伪检查\n当前最重要假设：瓶颈真实存在\n如果我是错的，最可能因为什么？样本偏差\n验证这个假设的最小动作是什么？访谈5个团队";

    async fn engine_with(
        outputs: Vec<Result<&str, &str>>,
    ) -> (DebateEngine, Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new("做一个代码审查工具", "zh");
        store.create_session(&session).await.unwrap();
        let oracle = Arc::new(ScriptedOracle::new(outputs));
        let engine = DebateEngine::new(store.clone(), oracle, DebateConfig::default());
        (engine, store, session)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DebateEvent>) -> Vec<DebateEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_start_round_streams_architect_and_awaits_confirmation() {
        let (engine, store, session) = engine_with(vec![Ok("## 核心问题\n- 审查太慢")]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine.process(Action::new(session.id, ActionKind::StartRound), &tx).await.unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            events.first(),
            Some(DebateEvent::PhaseChange { phase: DebatePhase::Architect, round: Some(1) })
        ));
        assert!(matches!(events.last(), Some(DebateEvent::Done)));
        assert!(events
            .iter()
            .any(|e| matches!(e, DebateEvent::RoleComplete { role: Role::Architect, .. })));

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.current_round, 1);
        assert_eq!(updated.phase, DebatePhase::UserConfirm);
        assert_eq!(store.messages_by_role(session.id, 1, Role::Architect).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_round_rejected_outside_idle() {
        let (engine, store, mut session) = engine_with(vec![]).await;
        session.phase = DebatePhase::UserResponse;
        session.current_round = 1;
        store.update_session(&session).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = engine
            .process(Action::new(session.id, ActionKind::StartRound), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::PhaseViolation { .. }));

        // No side effects.
        let unchanged = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(unchanged.current_round, 1);
        assert_eq!(unchanged.phase, DebatePhase::UserResponse);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (engine, _store, _session) = engine_with(vec![]).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = engine
            .process(Action::new(Uuid::new_v4(), ActionKind::StartRound), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_confirm_runs_challengers_and_conflict_rules() {
        let (engine, store, session) = engine_with(vec![
            Ok("## 核心问题\n- 审查太慢"),
            Ok("真正的问题可能是：团队根本没有审查文化。\n## 攻击\n- 谁付费？"),
            Ok("我同意，没问题。"),
        ])
        .await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine.process(Action::new(session.id, ActionKind::StartRound), &tx).await.unwrap();
        drain(&mut rx);
        engine
            .process(
                Action::new(session.id, ActionKind::UserConfirm).with_content("确认这个定义"),
                &tx,
            )
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            DebateEvent::ConflictAlert {
                conflict_type: ConflictRule::AlternativeHypothesis,
                ..
            }
        )));

        let conflicts = store.list_conflicts(session.id).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].detail.starts_with("刺客: "));

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.phase, DebatePhase::UserResponse);
    }

    #[tokio::test]
    async fn test_conflict_choice_without_pending_event_is_rejected() {
        let (engine, _store, session) = engine_with(vec![]).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = engine
            .process(
                Action::new(session.id, ActionKind::ConflictChoice)
                    .with_content("counter")
                    .with_choice(ConflictChoice::Counter),
                &tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::PhaseViolation { .. }));
    }

    #[tokio::test]
    async fn test_conflict_choice_resolves_latest_pending_event() {
        let (engine, store, mut session) = engine_with(vec![]).await;
        session.current_round = 1;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        store
            .append_conflict(&ConflictEvent::new(
                session.id,
                1,
                ConflictRule::TechEscape,
                "User response focuses on tech capability",
            ))
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .process(
                Action::new(session.id, ActionKind::ConflictChoice)
                    .with_content("有3家客户签了付费意向")
                    .with_choice(ConflictChoice::Counter),
                &tx,
            )
            .await
            .unwrap();

        let conflicts = store.list_conflicts(session.id).await.unwrap();
        assert_eq!(conflicts[0].user_choice.as_deref(), Some("有3家客户签了付费意向"));

        // Phase is unchanged by a resolution.
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            DebateEvent::PhaseChange { phase: DebatePhase::UserResponse, .. }
        )));
        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.phase, DebatePhase::UserResponse);
    }

    #[tokio::test]
    async fn test_force_opposition_regenerates_assassin_as_forced_message() {
        let (engine, store, mut session) =
            engine_with(vec![Ok("## 攻击\n- 需求真实性存疑，付费数据在哪里？")]).await;
        session.current_round = 1;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        store
            .append_conflict(&ConflictEvent::new(
                session.id,
                1,
                ConflictRule::ConsensusAlert,
                "All roles converging",
            ))
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .process(
                Action::new(session.id, ActionKind::ConflictChoice)
                    .with_content("重新攻击")
                    .with_choice(ConflictChoice::ForceOpposition),
                &tx,
            )
            .await
            .unwrap();

        let assassins = store.messages_by_role(session.id, 1, Role::Assassin).await.unwrap();
        assert_eq!(assassins.len(), 1);
        assert_eq!(assassins[0].metadata.as_deref(), Some(r#"{"forced":true}"#));

        let conflicts = store.list_conflicts(session.id).await.unwrap();
        assert!(conflicts.iter().any(|c| c.rule == ConflictRule::ForcedOpposition));
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, DebateEvent::RoleComplete { role: Role::Assassin, .. })));
    }

    #[tokio::test]
    async fn test_user_response_detects_tech_escape_and_grounds() {
        let (engine, store, mut session) = engine_with(vec![Ok(VALID_GROUNDER)]).await;
        session.current_round = 1;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .process(
                Action::new(session.id, ActionKind::UserResponse)
                    .with_content("AI可以缩短开发周期，大模型辅助一切，开发很快。"),
                &tx,
            )
            .await
            .unwrap();

        let conflicts = store.list_conflicts(session.id).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].rule, ConflictRule::TechEscape);

        let events = drain(&mut rx);
        let grounding_pos = events
            .iter()
            .position(|e| {
                matches!(e, DebateEvent::PhaseChange { phase: DebatePhase::Grounding, .. })
            })
            .unwrap();
        let complete_pos = events
            .iter()
            .position(|e| {
                matches!(e, DebateEvent::PhaseChange { phase: DebatePhase::RoundComplete, .. })
            })
            .unwrap();
        assert!(grounding_pos < complete_pos);

        let grounders = store.messages_by_role(session.id, 1, Role::Grounder).await.unwrap();
        assert_eq!(grounders.len(), 1);
    }

    #[tokio::test]
    async fn test_grounder_validation_failure_triggers_single_regeneration() {
        let (engine, store, mut session) = engine_with(vec![
            Ok("## 当前最强假设\n1. 没有证伪检查的输出"),
            Ok(VALID_GROUNDER),
        ])
        .await;
        session.current_round = 1;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .process(Action::new(session.id, ActionKind::UserResponse).with_content("回应"), &tx)
            .await
            .unwrap();

        let events = drain(&mut rx);
        let regen_alerts = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    DebateEvent::ConflictAlert {
                        conflict_type: ConflictRule::FalsificationBlock,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(regen_alerts, 1);

        let grounders = store.messages_by_role(session.id, 1, Role::Grounder).await.unwrap();
        assert!(validate_falsification_block(&grounders[0].content));
    }

    #[tokio::test]
    async fn test_grounder_oracle_failure_falls_back_deterministically() {
        let (engine, store, mut session) = engine_with(vec![Err("connection reset")]).await;
        session.current_round = 1;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        store
            .append_message(&Message::new(
                session.id,
                1,
                Role::Architect,
                "## 核心问题\n- 审查流程过长",
            ))
            .await
            .unwrap();
        store
            .append_message(&Message::new(
                session.id,
                1,
                Role::Assassin,
                "## 隐含假设\n- 团队愿意改流程",
            ))
            .await
            .unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        engine
            .process(Action::new(session.id, ActionKind::UserResponse).with_content("回应"), &tx)
            .await
            .unwrap();

        let grounders = store.messages_by_role(session.id, 1, Role::Grounder).await.unwrap();
        assert!(validate_falsification_block(&grounders[0].content));
        assert!(grounders[0].content.contains("审查流程过长"));
        assert!(grounders[0].content.contains("降级生成"));

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.phase, DebatePhase::RoundComplete);
    }

    #[tokio::test]
    async fn test_attack_failure_restores_phase_for_retry() {
        let (engine, store, session) =
            engine_with(vec![Ok("## 核心问题\n- A"), Err("timeout")]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.process(Action::new(session.id, ActionKind::StartRound), &tx).await.unwrap();
        drain(&mut rx);

        let err = engine
            .process(Action::new(session.id, ActionKind::UserConfirm).with_content("确认"), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::OracleHardFailure(_)));
        assert!(drain(&mut rx).iter().any(|e| matches!(e, DebateEvent::Error { .. })));

        // Phase restored so user_confirm can be retried.
        let restored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(restored.phase, DebatePhase::UserConfirm);
        assert_eq!(restored.current_round, 1);
    }

    #[tokio::test]
    async fn test_final_round_completes_session_and_rejects_next_round() {
        let (engine, store, mut session) = engine_with(vec![Ok(VALID_GROUNDER)]).await;
        session.current_round = MAX_ROUNDS;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        engine
            .process(Action::new(session.id, ActionKind::UserResponse).with_content("回应"), &tx)
            .await
            .unwrap();

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.status, SessionStatus::Completed);

        let err = engine
            .process(Action::new(session.id, ActionKind::NextRound), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::PhaseViolation { .. }));
    }

    #[tokio::test]
    async fn test_convergence_reported_from_round_two() {
        let (engine, store, mut session) = engine_with(vec![Ok(VALID_GROUNDER)]).await;
        session.current_round = 2;
        session.phase = DebatePhase::UserResponse;
        store.update_session(&session).await.unwrap();
        store
            .append_message(&Message::new(session.id, 1, Role::Grounder, VALID_GROUNDER))
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .process(Action::new(session.id, ActionKind::UserResponse).with_content("回应"), &tx)
            .await
            .unwrap();

        let events = drain(&mut rx);
        let convergence = events.iter().find_map(|e| match e {
            DebateEvent::ConvergenceCheck { converged, detail } => Some((*converged, detail.clone())),
            _ => None,
        });
        let (converged, detail) = convergence.expect("convergence event expected");
        assert!(converged);
        assert_eq!(detail, "score=1.00");
    }

    #[tokio::test]
    async fn test_end_session_completes_from_any_phase() {
        let (engine, store, mut session) = engine_with(vec![]).await;
        session.current_round = 2;
        session.phase = DebatePhase::Attacking;
        store.update_session(&session).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine.process(Action::new(session.id, ActionKind::EndSession), &tx).await.unwrap();

        let updated = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(updated.status, SessionStatus::Completed);
        assert_eq!(updated.phase, DebatePhase::Idle);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            DebateEvent::PhaseChange { phase: DebatePhase::Idle, round: None }
        )));
    }
}
