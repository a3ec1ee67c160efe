//! Core of the practice assistant: domain records, ports, the content request
//! validator, the AI drafting gateway and the submission orchestrator.
//! Nothing in this crate talks to a database or to the network directly.

pub mod domain;
pub mod gateway;
pub mod orchestrator;
pub mod ports;
pub mod tasks;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ContentType, EducationalContent, Exercise, Patient, Record, RecordId, SessionNote,
    TheoreticalApproach, TreatmentPlan,
};
pub use gateway::{AiGateway, GatewayError, GeneratedFields};
pub use orchestrator::{
    Accepted, Orchestrator, OrchestratorConfig, Rejected, SubmissionError, SubmissionState, Target,
};
pub use ports::{
    GenerationRequest, ListFilter, PortError, PortResult, RecordStore, TextGenerationService,
};
pub use tasks::{FailurePolicy, TaskKind};
pub use validation::{RawFields, ValidationErrors};
