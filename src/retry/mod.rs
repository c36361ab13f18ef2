//! Retry engine: outcome classification, backoff policy and the scheduler
//! that ties them together.

mod classify;
mod policy;
mod scheduler;

pub use classify::{
    Outcome, RETRIABLE_ERROR_CODES, RETRIABLE_STATUS, RetryReason, classify, is_retriable_status,
};
pub use policy::{
    DEFAULT_FACTOR, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY,
    DEFAULT_RANDOMIZATION_FACTOR, RetryPolicy,
};
pub use scheduler::{Completion, Scheduler};
