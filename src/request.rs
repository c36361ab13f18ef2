//! Public entry points: issue a request and retry it until it settles.

use tokio::task::JoinHandle;

use crate::http::{HttpClient, HttpResponse, RequestError, RequestSpec, ResponseBody, SendAttempt};
use crate::retry::{Completion, RetryPolicy, Scheduler};
use crate::runtime::{Timer, TokioTimer};

/// Pairs a request issuer with a timer. Holds no per-call state, so one
/// client can serve any number of concurrent calls.
pub struct RetryClient<S: SendAttempt, T: Timer> {
    issuer: S,
    timer: T,
}

impl<S: SendAttempt, T: Timer> RetryClient<S, T> {
    pub fn new(issuer: S, timer: T) -> Self {
        Self { issuer, timer }
    }

    /// Sends `spec` under `policy` and waits for the final outcome.
    #[tracing::instrument(skip(self, policy, spec), fields(method = %spec.method, uri = %spec.uri))]
    pub async fn execute(&self, policy: &RetryPolicy, spec: &RequestSpec) -> Completion {
        Scheduler::new(policy, &self.timer)
            .run(|_| self.issuer.send(spec))
            .await
    }
}

impl RetryClient<HttpClient, TokioTimer> {
    pub fn with_defaults() -> Result<Self, RequestError> {
        Ok(Self::new(HttpClient::with_defaults()?, TokioTimer))
    }
}

/// Sends `options` with the default backoff, retrying up to `max_retries`
/// times (20 when `None`).
pub async fn send_with_retry(max_retries: Option<u32>, options: &RequestSpec) -> Completion {
    let policy = RetryPolicy::with_max_retries(max_retries);
    match RetryClient::with_defaults() {
        Ok(client) => client.execute(&policy, options).await,
        Err(e) => Completion::failure(e, None, 1),
    }
}

/// Spawns the call on the current tokio runtime and hands the outcome to
/// `callback` exactly once: `(None, Some(response), Some(body))` on
/// success, `(Some(error), response, None)` otherwise.
///
/// # Panics
///
/// Panics when called outside a tokio runtime, like [`tokio::spawn`].
pub fn retry_request<F>(max_retries: Option<u32>, options: RequestSpec, callback: F) -> JoinHandle<()>
where
    F: FnOnce(Option<RequestError>, Option<HttpResponse>, Option<ResponseBody>) + Send + 'static,
{
    tokio::spawn(async move {
        let completion = send_with_retry(max_retries, &options).await;
        callback(completion.error, completion.response, completion.body);
    })
}
