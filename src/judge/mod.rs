//! Judge client - async boundary to the external code-execution sandbox

mod client;

pub use client::{HttpJudgeClient, JudgeClient, JudgeRequest, JudgeVerdict, TestResult};
