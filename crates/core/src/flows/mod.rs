pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, IntakeFlow};
pub use states::{Field, FlowAction, FlowContext, FlowEvent, Phase, TransitionOutcome};
