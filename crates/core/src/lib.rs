pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod handoff;
pub mod taxonomy;
pub mod validators;

pub use domain::candidate::{AnsweredQuestion, CandidateRecord, CompletionStatus};
pub use domain::question::{Question, QuestionSet, QuestionSource};
pub use domain::session::{Session, SessionId};
pub use errors::{DomainError, IntakeError};
pub use flows::{Field, FlowEngine, FlowEvent, IntakeFlow, Phase};
pub use handoff::{DataHandler, DiscardingDataHandler, PersistenceError};
pub use taxonomy::{TaxonomyError, TechCategory, TechTaxonomy, TechTaxonomyEntry};
pub use validators::{TechStackValidation, ValidationFailure};
