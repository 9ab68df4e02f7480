use talentscout_core::domain::session::Session;
use talentscout_core::errors::IntakeError;
use talentscout_core::flows::{Field, FlowEvent, Phase};
use talentscout_core::taxonomy::TechTaxonomy;
use talentscout_core::validators::{
    validate_desired_roles, validate_email, validate_name, validate_phone, validate_tech_stack,
    validate_years_experience, ValidationFailure,
};

const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "bye", "goodbye", "stop", "end"];
const AFFIRMATIVE: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "correct", "confirm", "confirmed", "ok", "okay",
    "right", "that's correct", "that is correct", "looks good", "all good", "yes please",
];
const NEGATIVE: &[&str] = &[
    "no", "n", "nope", "nah", "incorrect", "wrong", "not correct", "start over", "restart",
];
const STACK_FINISHED: &[&str] = &["done", "that's all", "that is all", "no more", "continue"];

/// What one user turn changes in the record.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordUpdate {
    None,
    Name(String),
    Email(String),
    Phone(String),
    YearsExperience(f64),
    DesiredRoles(Vec<String>),
    Technologies { accepted: Vec<String>, unresolved: Vec<String> },
    Answer(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interpretation {
    pub event: FlowEvent,
    pub update: RecordUpdate,
    pub issue: Option<IntakeError>,
}

impl Interpretation {
    fn event(event: FlowEvent) -> Self {
        Self { event, update: RecordUpdate::None, issue: None }
    }

    fn accepted(field: Field, update: RecordUpdate) -> Self {
        Self { event: FlowEvent::FieldAccepted(field), update, issue: None }
    }

    fn rejected(field: Field, failure: ValidationFailure) -> Self {
        Self {
            event: FlowEvent::FieldRejected(field),
            update: RecordUpdate::None,
            issue: Some(IntakeError::ValidationFailure { field, failure }),
        }
    }
}

/// Maps raw user text onto a flow event for the session's current phase.
/// Stateless; the taxonomy is only read.
#[derive(Clone, Copy, Debug)]
pub struct TurnInterpreter<'a> {
    taxonomy: &'a TechTaxonomy,
}

impl<'a> TurnInterpreter<'a> {
    pub fn new(taxonomy: &'a TechTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// `None` for phases that take no user input (`Closing`, `Closed`).
    pub fn interpret(&self, session: &Session, text: &str) -> Option<Interpretation> {
        let phase = session.phase();
        if phase.accepts_exit() && is_exit_request(text) {
            return Some(Interpretation::event(FlowEvent::ExitRequested));
        }

        let interpretation = match phase {
            Phase::Greeting => Interpretation::event(FlowEvent::GreetingAcknowledged),
            Phase::Gathering { field } => self.gather(*field, session, text),
            Phase::Confirming => Interpretation::event(match confirmation(text) {
                Some(true) => FlowEvent::Confirmed,
                Some(false) => FlowEvent::Declined,
                None => FlowEvent::ConfirmationUnclear,
            }),
            Phase::Questioning { .. } => {
                let answer = text.trim();
                if answer.is_empty() {
                    Interpretation::event(FlowEvent::AnswerMissing)
                } else {
                    Interpretation {
                        event: FlowEvent::AnswerRecorded,
                        update: RecordUpdate::Answer(answer.to_owned()),
                        issue: None,
                    }
                }
            }
            Phase::Closing | Phase::Closed => return None,
        };
        Some(interpretation)
    }

    fn gather(&self, field: Field, session: &Session, text: &str) -> Interpretation {
        let result = match field {
            Field::Name => validate_name(text).map(RecordUpdate::Name),
            Field::Email => validate_email(text).map(RecordUpdate::Email),
            Field::Phone => validate_phone(text).map(RecordUpdate::Phone),
            Field::YearsExperience => {
                validate_years_experience(text).map(RecordUpdate::YearsExperience)
            }
            Field::DesiredRoles => validate_desired_roles(text).map(RecordUpdate::DesiredRoles),
            Field::TechStack => return self.gather_tech_stack(session, text),
        };
        match result {
            Ok(update) => Interpretation::accepted(field, update),
            Err(failure) => Interpretation::rejected(field, failure),
        }
    }

    fn gather_tech_stack(&self, session: &Session, text: &str) -> Interpretation {
        let holds_technologies = !session.record().tech_stack.is_empty();
        if STACK_FINISHED.contains(&normalize_reply(text).as_str()) {
            return if holds_technologies {
                Interpretation::accepted(Field::TechStack, RecordUpdate::None)
            } else {
                Interpretation::rejected(Field::TechStack, ValidationFailure::EmptyInput)
            };
        }

        let validation = match validate_tech_stack(text, self.taxonomy) {
            Ok(validation) => validation,
            Err(failure) => return Interpretation::rejected(Field::TechStack, failure),
        };

        if validation.is_complete() {
            return Interpretation::accepted(
                Field::TechStack,
                RecordUpdate::Technologies { accepted: validation.accepted, unresolved: Vec::new() },
            );
        }

        let issue = IntakeError::UnresolvedTechnology { tokens: validation.unresolved.clone() };
        if holds_technologies || !validation.accepted.is_empty() {
            Interpretation {
                event: FlowEvent::TechnologiesPartiallyAccepted,
                update: RecordUpdate::Technologies {
                    accepted: validation.accepted,
                    unresolved: validation.unresolved,
                },
                issue: Some(issue),
            }
        } else {
            Interpretation {
                event: FlowEvent::FieldRejected(Field::TechStack),
                update: RecordUpdate::Technologies {
                    accepted: Vec::new(),
                    unresolved: validation.unresolved.clone(),
                },
                issue: Some(IntakeError::ValidationFailure {
                    field: Field::TechStack,
                    failure: ValidationFailure::UnknownTechnology { tokens: validation.unresolved },
                }),
            }
        }
    }
}

/// True when the whole message is an exit keyword.
pub fn is_exit_request(text: &str) -> bool {
    EXIT_KEYWORDS.contains(&normalize_reply(text).as_str())
}

fn confirmation(text: &str) -> Option<bool> {
    let reply = normalize_reply(text);
    if AFFIRMATIVE.contains(&reply.as_str()) {
        Some(true)
    } else if NEGATIVE.contains(&reply.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Lowercases, collapses whitespace, and trims surrounding punctuation.
fn normalize_reply(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_matches(|character: char| !character.is_alphanumeric())
        .to_owned()
}

#[cfg(test)]
mod tests {
    use talentscout_core::domain::candidate::CandidateRecord;
    use talentscout_core::domain::session::Session;
    use talentscout_core::errors::IntakeError;
    use talentscout_core::flows::{Field, FlowEvent, Phase};
    use talentscout_core::taxonomy::TechTaxonomy;
    use talentscout_core::validators::ValidationFailure;

    use super::{is_exit_request, RecordUpdate, TurnInterpreter};

    fn taxonomy() -> TechTaxonomy {
        TechTaxonomy::builtin().expect("builtin taxonomy")
    }

    fn session_in(phase: Phase) -> Session {
        Session::new(phase)
    }

    #[test]
    fn exit_keywords_only_match_whole_messages() {
        assert!(is_exit_request("exit"));
        assert!(is_exit_request("  Bye! "));
        assert!(is_exit_request("QUIT."));
        assert!(!is_exit_request("I would stop the container first"));
        assert!(!is_exit_request("byebug"));
    }

    #[test]
    fn exit_wins_in_every_open_phase() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);
        for phase in [
            Phase::Greeting,
            Phase::gathering(Field::Email),
            Phase::Confirming,
            Phase::Questioning { index: 0 },
        ] {
            let interpretation =
                interpreter.interpret(&session_in(phase.clone()), "exit").expect("interpretation");
            assert_eq!(interpretation.event, FlowEvent::ExitRequested, "{phase:?}");
        }
        assert!(interpreter.interpret(&session_in(Phase::Closed), "exit").is_none());
    }

    #[test]
    fn gathering_validates_the_current_field() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);

        let accepted = interpreter
            .interpret(&session_in(Phase::gathering(Field::Email)), "it's Ada@Example.com")
            .expect("interpretation");
        assert_eq!(accepted.event, FlowEvent::FieldAccepted(Field::Email));
        assert_eq!(accepted.update, RecordUpdate::Email("ada@example.com".to_owned()));

        let rejected = interpreter
            .interpret(&session_in(Phase::gathering(Field::YearsExperience)), "sixty")
            .expect("interpretation");
        assert_eq!(rejected.event, FlowEvent::FieldRejected(Field::YearsExperience));
        assert_eq!(
            rejected.issue,
            Some(IntakeError::ValidationFailure {
                field: Field::YearsExperience,
                failure: ValidationFailure::NotANumber,
            })
        );
    }

    #[test]
    fn partial_tech_stack_keeps_resolved_tokens() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);
        let interpretation = interpreter
            .interpret(&session_in(Phase::gathering(Field::TechStack)), "Python, Djangoo, AWS")
            .expect("interpretation");

        assert_eq!(interpretation.event, FlowEvent::TechnologiesPartiallyAccepted);
        assert_eq!(
            interpretation.update,
            RecordUpdate::Technologies {
                accepted: vec!["python".to_owned(), "aws".to_owned()],
                unresolved: vec!["Djangoo".to_owned()],
            }
        );
    }

    #[test]
    fn nothing_recognised_rejects_the_stack() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);
        let interpretation = interpreter
            .interpret(&session_in(Phase::gathering(Field::TechStack)), "Blorp")
            .expect("interpretation");
        assert_eq!(interpretation.event, FlowEvent::FieldRejected(Field::TechStack));
    }

    #[test]
    fn done_finishes_stack_only_when_something_is_held() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);

        let empty = session_in(Phase::gathering(Field::TechStack));
        let interpretation = interpreter.interpret(&empty, "done").expect("interpretation");
        assert_eq!(interpretation.event, FlowEvent::FieldRejected(Field::TechStack));

        let mut holding = session_in(Phase::gathering(Field::TechStack));
        holding
            .replace_record(CandidateRecord {
                tech_stack: vec!["rust".to_owned()],
                ..CandidateRecord::default()
            })
            .expect("open session");
        let interpretation = interpreter.interpret(&holding, "That's all.").expect("interpretation");
        assert_eq!(interpretation.event, FlowEvent::FieldAccepted(Field::TechStack));
        assert_eq!(interpretation.update, RecordUpdate::None);
    }

    #[test]
    fn confirmation_words_are_recognised() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);
        let confirming = session_in(Phase::Confirming);

        let event = |text: &str| interpreter.interpret(&confirming, text).map(|i| i.event);
        assert_eq!(event("Yes!"), Some(FlowEvent::Confirmed));
        assert_eq!(event("looks good"), Some(FlowEvent::Confirmed));
        assert_eq!(event("nope"), Some(FlowEvent::Declined));
        assert_eq!(event("maybe later"), Some(FlowEvent::ConfirmationUnclear));
    }

    #[test]
    fn blank_answers_are_not_recorded() {
        let taxonomy = taxonomy();
        let interpreter = TurnInterpreter::new(&taxonomy);
        let questioning = session_in(Phase::Questioning { index: 2 });

        let blank = interpreter.interpret(&questioning, "   ").expect("interpretation");
        assert_eq!(blank.event, FlowEvent::AnswerMissing);

        let answered = interpreter
            .interpret(&questioning, "  I would profile first. ")
            .expect("interpretation");
        assert_eq!(answered.update, RecordUpdate::Answer("I would profile first.".to_owned()));
    }
}
