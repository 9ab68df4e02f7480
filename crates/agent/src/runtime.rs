use std::collections::VecDeque;
use std::sync::Arc;

use talentscout_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use talentscout_core::domain::candidate::{AnsweredQuestion, CandidateRecord, Speaker};
use talentscout_core::domain::session::Session;
use talentscout_core::errors::{DomainError, IntakeError};
use talentscout_core::flows::{
    Field, FlowAction, FlowContext, FlowEngine, FlowEvent, IntakeFlow, Phase, TransitionOutcome,
};
use talentscout_core::handoff::DataHandler;
use talentscout_core::taxonomy::TechTaxonomy;
use uuid::Uuid;

use crate::conversation::{Interpretation, RecordUpdate, TurnInterpreter};
use crate::prompts;
use crate::questions::QuestionGenerator;

const ACTOR: &str = "intake-runtime";
const DEFAULT_APP_NAME: &str = "TalentScout's Hiring Assistant";

/// The result of one call into the runtime: the updated session and exactly one prompt.
#[derive(Clone, Debug)]
pub struct Turn {
    pub session: Session,
    pub prompt: String,
}

/// Drives one conversation turn at a time. Holds no per-session state, so a
/// single runtime serves any number of sessions.
pub struct IntakeRuntime {
    engine: FlowEngine<IntakeFlow>,
    taxonomy: Arc<TechTaxonomy>,
    generator: QuestionGenerator,
    data_handler: Arc<dyn DataHandler>,
    audit: Arc<dyn AuditSink>,
    app_name: String,
}

impl IntakeRuntime {
    pub fn new(
        taxonomy: Arc<TechTaxonomy>,
        generator: QuestionGenerator,
        data_handler: Arc<dyn DataHandler>,
    ) -> Self {
        Self {
            engine: FlowEngine::default(),
            taxonomy,
            generator,
            data_handler,
            audit: Arc::new(TracingAuditSink),
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn taxonomy(&self) -> &TechTaxonomy {
        &self.taxonomy
    }

    pub fn start(&self) -> Turn {
        let mut session = Session::new(self.engine.initial_phase());
        self.audit.emit(
            AuditEvent::new(
                Some(session.id().clone()),
                Uuid::new_v4().to_string(),
                "intake.session_started",
                AuditCategory::Intake,
                ACTOR,
                AuditOutcome::Success,
            )
            .with_metadata("flow", self.engine.flow_name()),
        );
        tracing::info!(
            event_name = "intake.session.started",
            session_id = %session.id(),
            "intake session started"
        );
        let prompt = prompts::greeting(&self.app_name);
        session.note_message(Speaker::Assistant, &prompt);
        Turn { session, prompt }
    }

    /// Consumes one user message. Never fails: validation problems become
    /// clarification prompts and collaborator failures become apologies.
    pub async fn advance(&self, mut session: Session, text: &str) -> Turn {
        if session.is_closed() {
            return Turn { session, prompt: prompts::SESSION_ENDED.to_owned() };
        }

        let audit = AuditContext::new(Some(session.id().clone()), Uuid::new_v4().to_string(), ACTOR);
        let turn_number = match session.begin_turn() {
            Ok(turn_number) => turn_number,
            Err(_) => return Turn { session, prompt: prompts::SESSION_ENDED.to_owned() },
        };
        session.note_message(Speaker::Candidate, text);

        let interpretation = match TurnInterpreter::new(&self.taxonomy).interpret(&session, text) {
            Some(interpretation) => interpretation,
            None => {
                // A session left in Closing only needs its hand-off finished.
                let mut prompt = Vec::new();
                self.hand_off(&mut session, &audit, &mut prompt).await;
                return finish_turn(session, prompt);
            }
        };

        if let Some(issue) = &interpretation.issue {
            tracing::info!(
                event_name = "intake.input.rejected",
                session_id = %session.id(),
                phase = session.phase().name(),
                error_kind = issue.kind(),
                "user input needs clarification"
            );
        }

        let mut prompt = Vec::new();
        if let Err(error) = self.step(&mut session, interpretation, &audit, &mut prompt).await {
            tracing::error!(
                event_name = "intake.turn.failed",
                session_id = %session.id(),
                phase = session.phase().name(),
                error = %error,
                "turn could not be applied"
            );
            prompt.push(self.current_prompt(&session));
        }

        tracing::info!(
            event_name = "intake.turn.advanced",
            session_id = %session.id(),
            correlation_id = %audit.correlation_id,
            turn = turn_number,
            phase = session.phase().name(),
            "intake turn advanced"
        );
        finish_turn(session, prompt)
    }

    async fn step(
        &self,
        session: &mut Session,
        interpretation: Interpretation,
        audit: &AuditContext,
        prompt: &mut Vec<String>,
    ) -> Result<(), DomainError> {
        let Interpretation { event, update, issue } = interpretation;
        let mut record = session.record().clone();
        let pending = apply_update(&mut record, session, update);

        let context = FlowContext {
            missing_required_fields: record.missing_fields(),
            question_count: session.question_count(),
        };
        let outcome =
            self.engine.apply_with_audit(session.phase(), &event, &context, self.audit.as_ref(), audit)?;

        session.replace_record(record)?;
        if let Some(tokens) = pending {
            session.set_pending_technologies(tokens)?;
        } else if event == FlowEvent::FieldAccepted(Field::TechStack) {
            session.set_pending_technologies(Vec::new())?;
        }
        if event == FlowEvent::AnswerMissing {
            prompt.push(prompts::answer_missing().to_owned());
        }
        self.execute(session, outcome, issue.as_ref(), audit, prompt).await
    }

    async fn execute(
        &self,
        session: &mut Session,
        outcome: TransitionOutcome,
        issue: Option<&IntakeError>,
        audit: &AuditContext,
        prompt: &mut Vec<String>,
    ) -> Result<(), DomainError> {
        let early_exit = outcome.event == FlowEvent::ExitRequested;
        session.enter_phase(outcome.to.clone())?;
        let mut actions: VecDeque<FlowAction> = outcome.actions.into();

        while let Some(action) = actions.pop_front() {
            match action {
                FlowAction::PromptForField(field) => {
                    prompt.push(prompts::ask_field(field, session.record()));
                }
                FlowAction::RepromptField(field) => {
                    let text = match issue {
                        Some(IntakeError::ValidationFailure { failure, .. }) => {
                            prompts::clarification(field, failure)
                        }
                        _ => prompts::field_question(field).to_owned(),
                    };
                    prompt.push(text);
                }
                FlowAction::PromptForUnresolvedTechnologies => {
                    prompt.push(prompts::unresolved_technologies(
                        session.pending_technologies(),
                        session.record(),
                        &self.taxonomy,
                    ));
                }
                FlowAction::PresentSummary => {
                    prompt.push(prompts::summary(session.record(), &self.taxonomy));
                }
                FlowAction::ResetRecord => {
                    session.reset_record()?;
                    prompt.push(prompts::RESTART_NOTICE.to_owned());
                }
                FlowAction::RepromptConfirmation => {
                    prompt.push(prompts::CONFIRMATION_REPROMPT.to_owned());
                }
                FlowAction::GenerateQuestions => {
                    let total = self.generate_questions(session, audit).await?;
                    if total == 0 {
                        let exhausted = self.engine.apply_with_audit(
                            session.phase(),
                            &FlowEvent::QuestionsExhausted,
                            &FlowContext { missing_required_fields: Vec::new(), question_count: 0 },
                            self.audit.as_ref(),
                            audit,
                        )?;
                        session.enter_phase(exhausted.to.clone())?;
                        actions = exhausted.actions.into();
                    } else {
                        prompt.push(prompts::technical_intro(total));
                    }
                }
                FlowAction::AskQuestion(index) => {
                    let total = session.question_count();
                    if let Some(question) = session.questions().and_then(|set| set.get(index)) {
                        prompt.push(prompts::ask_question(index, total, question, &self.taxonomy));
                    }
                }
                FlowAction::SendFarewell => {
                    prompt.push(prompts::farewell(!early_exit));
                }
                FlowAction::PersistRecord => {
                    self.hand_off(session, audit, prompt).await;
                }
            }
        }
        Ok(())
    }

    async fn generate_questions(
        &self,
        session: &mut Session,
        audit: &AuditContext,
    ) -> Result<usize, DomainError> {
        let record = session.record();
        let report = self.generator.generate(&record.tech_stack, record.years_experience).await;
        let total = report.questions.len();

        let mut event = AuditEvent::new(
            audit.session_id.clone(),
            audit.correlation_id.clone(),
            "questions.generated",
            AuditCategory::Questions,
            audit.actor.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("question_count", total.to_string())
        .with_metadata("technologies", report.questions.technologies().join(","))
        .with_metadata("llm_requests", report.llm_requests.to_string());
        if !report.fallbacks.is_empty() {
            let kinds: Vec<&str> = report.fallbacks.iter().map(IntakeError::kind).collect();
            event = event.with_metadata("fallbacks", kinds.join(","));
        }
        if !report.truncated.is_empty() {
            event = event.with_metadata("truncated", report.truncated.join(","));
        }
        self.audit.emit(event);

        session.install_questions(report.questions)?;
        Ok(total)
    }

    /// Hands the record to the data handler exactly once and closes the session.
    async fn hand_off(&self, session: &mut Session, audit: &AuditContext, prompt: &mut Vec<String>) {
        let status = session.record().completion_status();
        let result = self.data_handler.persist(session.id(), session.record()).await;
        let (event_type, outcome) = match &result {
            Ok(()) => ("handoff.persisted", AuditOutcome::Success),
            Err(_) => ("handoff.failed", AuditOutcome::Failed),
        };
        let mut event = AuditEvent::new(
            audit.session_id.clone(),
            audit.correlation_id.clone(),
            event_type,
            AuditCategory::Persistence,
            audit.actor.clone(),
            outcome,
        )
        .with_metadata("completion_status", status.as_str());

        if let Err(error) = result {
            let failure = IntakeError::PersistenceFailure(error.to_string());
            tracing::error!(
                event_name = "handoff.failed",
                session_id = %session.id(),
                error = %failure,
                "candidate record could not be persisted"
            );
            event = event.with_metadata("error", error.to_string());
            prompt.push(failure.user_message().to_owned());
        }
        self.audit.emit(event);

        let closed = self.engine.apply_with_audit(
            session.phase(),
            &FlowEvent::RecordHandedOff,
            &FlowContext::default(),
            self.audit.as_ref(),
            audit,
        );
        match closed {
            Ok(outcome) => {
                if let Err(error) = session.enter_phase(outcome.to) {
                    tracing::error!(
                        event_name = "intake.close.failed",
                        session_id = %session.id(),
                        error = %error,
                        "session could not be closed"
                    );
                }
            }
            Err(error) => {
                tracing::error!(
                    event_name = "intake.close.failed",
                    session_id = %session.id(),
                    error = %error,
                    "session could not be closed"
                );
            }
        }
    }

    fn current_prompt(&self, session: &Session) -> String {
        match session.phase() {
            Phase::Greeting => prompts::greeting(&self.app_name),
            Phase::Gathering { field } => prompts::field_question(*field).to_owned(),
            Phase::Confirming => prompts::summary(session.record(), &self.taxonomy),
            Phase::Questioning { index } => session
                .questions()
                .and_then(|set| set.get(*index))
                .map(|question| {
                    prompts::ask_question(*index, session.question_count(), question, &self.taxonomy)
                })
                .unwrap_or_else(|| prompts::answer_missing().to_owned()),
            Phase::Closing | Phase::Closed => prompts::SESSION_ENDED.to_owned(),
        }
    }
}

/// Applies a validated value to a working copy of the record. Returns the new
/// pending-technology list when the update touched the tech stack.
fn apply_update(
    record: &mut CandidateRecord,
    session: &Session,
    update: RecordUpdate,
) -> Option<Vec<String>> {
    match update {
        RecordUpdate::None => None,
        RecordUpdate::Name(name) => {
            record.name = Some(name);
            None
        }
        RecordUpdate::Email(email) => {
            record.email = Some(email);
            None
        }
        RecordUpdate::Phone(phone) => {
            record.phone = Some(phone);
            None
        }
        RecordUpdate::YearsExperience(years) => {
            record.years_experience = Some(years);
            None
        }
        RecordUpdate::DesiredRoles(roles) => {
            record.desired_roles = roles;
            None
        }
        RecordUpdate::Technologies { accepted, unresolved } => {
            record.merge_technologies(accepted);
            Some(unresolved)
        }
        RecordUpdate::Answer(answer) => {
            if let Phase::Questioning { index } = session.phase() {
                if let Some(question) = session.questions().and_then(|set| set.get(*index)) {
                    record.answers.push(AnsweredQuestion {
                        technology: question.technology.clone(),
                        question: question.text.clone(),
                        answer,
                    });
                }
            }
            None
        }
    }
}

fn finish_turn(mut session: Session, prompt: Vec<String>) -> Turn {
    let prompt = prompt.join("\n\n");
    session.note_message(Speaker::Assistant, &prompt);
    Turn { session, prompt }
}
