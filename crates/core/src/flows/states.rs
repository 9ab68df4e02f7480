use serde::{Deserialize, Serialize};

/// Candidate fields collected during gathering, in the order they are asked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Phone,
    YearsExperience,
    DesiredRoles,
    TechStack,
}

impl Field {
    pub const ORDER: [Field; 6] = [
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::YearsExperience,
        Field::DesiredRoles,
        Field::TechStack,
    ];

    pub fn first() -> Self {
        Self::ORDER[0]
    }

    pub fn next(self) -> Option<Self> {
        let position = Self::ORDER.iter().position(|field| *field == self)?;
        Self::ORDER.get(position + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::YearsExperience => "years_experience",
            Self::DesiredRoles => "desired_roles",
            Self::TechStack => "tech_stack",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "full name",
            Self::Email => "email address",
            Self::Phone => "phone number",
            Self::YearsExperience => "years of experience",
            Self::DesiredRoles => "desired positions",
            Self::TechStack => "tech stack",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Greeting,
    Gathering { field: Field },
    Confirming,
    Questioning { index: usize },
    Closing,
    Closed,
}

impl Phase {
    pub fn gathering(field: Field) -> Self {
        Self::Gathering { field }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Exit keywords force `Closing` from every phase that has not started closing.
    pub fn accepts_exit(&self) -> bool {
        !matches!(self, Self::Closing | Self::Closed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Gathering { .. } => "gathering",
            Self::Confirming => "confirming",
            Self::Questioning { .. } => "questioning",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    GreetingAcknowledged,
    FieldAccepted(Field),
    FieldRejected(Field),
    TechnologiesPartiallyAccepted,
    Confirmed,
    Declined,
    ConfirmationUnclear,
    AnswerRecorded,
    AnswerMissing,
    QuestionsExhausted,
    ExitRequested,
    RecordHandedOff,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_fields: Vec<Field>,
    pub question_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForField(Field),
    RepromptField(Field),
    PromptForUnresolvedTechnologies,
    PresentSummary,
    ResetRecord,
    RepromptConfirmation,
    GenerateQuestions,
    AskQuestion(usize),
    SendFarewell,
    PersistRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Phase,
    pub to: Phase,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
