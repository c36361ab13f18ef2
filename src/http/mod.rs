//! HTTP plumbing: request description, single-attempt client, responses.

mod client;
mod error;
mod request;
mod response;

pub use client::{
    HttpClient, SendAttempt, USER_AGENT, code_from_io_kind, code_from_message, from_reqwest,
};
#[cfg(test)]
pub use client::MockSendAttempt;
pub use error::{ErrorCode, RequestError};
pub use request::{Auth, RequestBody, RequestSpec};
pub use response::{AttemptResult, HttpResponse, ResponseBody};
