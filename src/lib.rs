pub mod http;
pub mod request;
pub mod retry;
pub mod runtime;

pub use http::{Auth, HttpResponse, RequestBody, RequestError, RequestSpec, ResponseBody};
pub use request::{RetryClient, retry_request, send_with_retry};
pub use retry::{Completion, RetryPolicy};
