use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{Field, FlowAction, FlowContext, FlowEvent, Phase, TransitionOutcome};

pub trait FlowDefinition {
    fn name(&self) -> &'static str;
    fn initial_phase(&self) -> Phase;
    fn transition(
        &self,
        current: &Phase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Greeting, field gathering, confirmation, screening questions, then closing.
#[derive(Clone, Debug, Default)]
pub struct IntakeFlow;

impl FlowDefinition for IntakeFlow {
    fn name(&self) -> &'static str {
        "candidate_intake"
    }

    fn initial_phase(&self) -> Phase {
        Phase::Greeting
    }

    fn transition(
        &self,
        current: &Phase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow.name()
    }

    pub fn initial_phase(&self) -> Phase {
        self.flow.initial_phase()
    }

    pub fn apply(
        &self,
        current: &Phase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &Phase,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: Phase, missing_fields: Vec<Field> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: Phase, event: FlowEvent },
}

fn transition_intake(
    current: &Phase,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        AskQuestion, GenerateQuestions, PersistRecord, PresentSummary, PromptForField,
        PromptForUnresolvedTechnologies, RepromptConfirmation, RepromptField, ResetRecord,
        SendFarewell,
    };
    use FlowEvent::{
        AnswerMissing, AnswerRecorded, ConfirmationUnclear, Confirmed, Declined, ExitRequested,
        FieldAccepted, FieldRejected, GreetingAcknowledged, QuestionsExhausted, RecordHandedOff,
        TechnologiesPartiallyAccepted,
    };
    use Phase::{Closed, Closing, Confirming, Gathering, Greeting, Questioning};

    let invalid = || FlowTransitionError::InvalidTransition {
        state: current.clone(),
        event: event.clone(),
    };

    let (to, actions) = match (current, event) {
        (Greeting, GreetingAcknowledged) => {
            (Phase::gathering(Field::first()), vec![PromptForField(Field::first())])
        }
        (Gathering { field }, FieldAccepted(accepted)) if field == accepted => match field.next()
        {
            Some(next) => (Phase::gathering(next), vec![PromptForField(next)]),
            None => {
                if !context.missing_required_fields.is_empty() {
                    return Err(FlowTransitionError::MissingRequiredFields {
                        state: current.clone(),
                        missing_fields: context.missing_required_fields.clone(),
                    });
                }
                (Confirming, vec![PresentSummary])
            }
        },
        (Gathering { field }, FieldRejected(rejected)) if field == rejected => {
            (current.clone(), vec![RepromptField(*field)])
        }
        (Gathering { field: Field::TechStack }, TechnologiesPartiallyAccepted) => {
            (current.clone(), vec![PromptForUnresolvedTechnologies])
        }
        (Confirming, Confirmed) => (Questioning { index: 0 }, vec![GenerateQuestions, AskQuestion(0)]),
        (Confirming, Declined) => (
            Phase::gathering(Field::first()),
            vec![ResetRecord, PromptForField(Field::first())],
        ),
        (Confirming, ConfirmationUnclear) => (Confirming, vec![RepromptConfirmation]),
        (Questioning { index }, AnswerRecorded) => {
            let next = index + 1;
            if next >= context.question_count {
                (Closing, vec![SendFarewell, PersistRecord])
            } else {
                (Questioning { index: next }, vec![AskQuestion(next)])
            }
        }
        (Questioning { index }, AnswerMissing) => (current.clone(), vec![AskQuestion(*index)]),
        (Questioning { .. }, QuestionsExhausted) => (Closing, vec![SendFarewell, PersistRecord]),
        (state, ExitRequested) if state.accepts_exit() => {
            (Closing, vec![SendFarewell, PersistRecord])
        }
        (Closing, RecordHandedOff) => (Closed, Vec::new()),
        _ => return Err(invalid()),
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::session::SessionId;
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, IntakeFlow};
    use crate::flows::states::{Field, FlowAction, FlowContext, FlowEvent, Phase};

    fn walk_gathering(engine: &FlowEngine<IntakeFlow>) -> Phase {
        let context = FlowContext::default();
        let mut phase = engine
            .apply(&engine.initial_phase(), &FlowEvent::GreetingAcknowledged, &context)
            .expect("greeting -> gathering")
            .to;
        for field in Field::ORDER {
            phase = engine
                .apply(&phase, &FlowEvent::FieldAccepted(field), &context)
                .expect("field accepted")
                .to;
        }
        phase
    }

    #[test]
    fn intake_flow_happy_path_reaches_closed() {
        let engine = FlowEngine::default();
        let phase = walk_gathering(&engine);
        assert_eq!(phase, Phase::Confirming);

        let context = FlowContext { question_count: 2, ..FlowContext::default() };
        let confirmed =
            engine.apply(&phase, &FlowEvent::Confirmed, &context).expect("confirming -> questions");
        assert_eq!(confirmed.to, Phase::Questioning { index: 0 });
        assert_eq!(
            confirmed.actions,
            vec![FlowAction::GenerateQuestions, FlowAction::AskQuestion(0)]
        );

        let second = engine
            .apply(&confirmed.to, &FlowEvent::AnswerRecorded, &context)
            .expect("first answer");
        assert_eq!(second.to, Phase::Questioning { index: 1 });
        assert_eq!(second.actions, vec![FlowAction::AskQuestion(1)]);

        let closing =
            engine.apply(&second.to, &FlowEvent::AnswerRecorded, &context).expect("last answer");
        assert_eq!(closing.to, Phase::Closing);
        assert_eq!(closing.actions, vec![FlowAction::SendFarewell, FlowAction::PersistRecord]);

        let closed = engine
            .apply(&closing.to, &FlowEvent::RecordHandedOff, &context)
            .expect("closing -> closed");
        assert_eq!(closed.to, Phase::Closed);
        assert!(closed.actions.is_empty());
    }

    #[test]
    fn rejected_field_stays_in_place() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(
                &Phase::gathering(Field::Email),
                &FlowEvent::FieldRejected(Field::Email),
                &FlowContext::default(),
            )
            .expect("reprompt");

        assert_eq!(outcome.to, Phase::gathering(Field::Email));
        assert_eq!(outcome.actions, vec![FlowAction::RepromptField(Field::Email)]);
    }

    #[test]
    fn accepting_a_different_field_is_invalid() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &Phase::gathering(Field::Email),
                &FlowEvent::FieldAccepted(Field::Phone),
                &FlowContext::default(),
            )
            .expect_err("cannot skip a field");

        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn missing_required_fields_block_confirmation() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &Phase::gathering(Field::TechStack),
                &FlowEvent::FieldAccepted(Field::TechStack),
                &FlowContext {
                    missing_required_fields: vec![Field::Phone],
                    ..FlowContext::default()
                },
            )
            .expect_err("must reject missing fields");

        assert_eq!(
            error,
            FlowTransitionError::MissingRequiredFields {
                state: Phase::gathering(Field::TechStack),
                missing_fields: vec![Field::Phone],
            }
        );
    }

    #[test]
    fn declining_summary_restarts_collection() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&Phase::Confirming, &FlowEvent::Declined, &FlowContext::default())
            .expect("declined");

        assert_eq!(outcome.to, Phase::gathering(Field::Name));
        assert_eq!(
            outcome.actions,
            vec![FlowAction::ResetRecord, FlowAction::PromptForField(Field::Name)]
        );
    }

    #[test]
    fn exit_is_honoured_from_every_open_phase() {
        let engine = FlowEngine::default();
        let phases = [
            Phase::Greeting,
            Phase::gathering(Field::Name),
            Phase::gathering(Field::DesiredRoles),
            Phase::Confirming,
            Phase::Questioning { index: 3 },
        ];
        for phase in phases {
            let outcome = engine
                .apply(&phase, &FlowEvent::ExitRequested, &FlowContext::default())
                .expect("exit accepted");
            assert_eq!(outcome.to, Phase::Closing);
            assert!(outcome.actions.contains(&FlowAction::PersistRecord));
        }

        for phase in [Phase::Closing, Phase::Closed] {
            let error = engine
                .apply(&phase, &FlowEvent::ExitRequested, &FlowContext::default())
                .expect_err("closing phases ignore exit");
            assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn empty_question_set_goes_straight_to_closing() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(
                &Phase::Questioning { index: 0 },
                &FlowEvent::QuestionsExhausted,
                &FlowContext::default(),
            )
            .expect("exhausted");
        assert_eq!(outcome.to, Phase::Closing);
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let run = |engine: &FlowEngine<IntakeFlow>| {
            let context = FlowContext { question_count: 1, ..FlowContext::default() };
            let mut phase = walk_gathering(engine);
            let mut actions = Vec::new();
            for event in [FlowEvent::Confirmed, FlowEvent::AnswerRecorded, FlowEvent::RecordHandedOff]
            {
                let outcome = engine.apply(&phase, &event, &context).expect("deterministic run");
                actions.push(outcome.actions);
                phase = outcome.to;
            }
            (phase, actions)
        };

        assert_eq!(run(&engine), run(&engine));
        assert_eq!(engine.flow_name(), IntakeFlow.name());
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let session_id = SessionId::new();

        let _ = engine
            .apply_with_audit(
                &Phase::Greeting,
                &FlowEvent::GreetingAcknowledged,
                &FlowContext::default(),
                &sink,
                &AuditContext::new(Some(session_id.clone()), "turn-1", "intake-runtime"),
            )
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &Phase::Closed,
            &FlowEvent::AnswerRecorded,
            &FlowContext::default(),
            &sink,
            &AuditContext::new(Some(session_id.clone()), "turn-2", "intake-runtime"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[0].session_id.as_ref(), Some(&session_id));
        assert_eq!(events[1].event_type, "flow.transition_rejected");
        assert_eq!(events[1].correlation_id, "turn-2");
    }
}
