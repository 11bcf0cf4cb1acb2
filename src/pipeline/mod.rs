//! Upload pipeline and recovery

pub mod diagnose;
pub mod orchestrator;

pub use diagnose::{diagnose, Diagnosis, RecoveryAction};
pub use orchestrator::{LicenseRequest, UploadOrchestrator, UploadOutcome, UploadRequest};
