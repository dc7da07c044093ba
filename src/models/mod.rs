//! Domain models

pub mod contest;
pub mod participant;
pub mod submission;

pub use contest::{Challenge, Contest, ContestStatus, TestCase};
pub use participant::{ChallengeRecord, Participant};
pub use submission::SubmissionAudit;
