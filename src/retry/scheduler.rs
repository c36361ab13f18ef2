//! Drives attempts until success, a terminal failure, or an exhausted budget.

use log::{debug, warn};
use std::future::Future;

use super::classify::{Outcome, classify};
use super::policy::RetryPolicy;
use crate::http::{AttemptResult, HttpResponse, RequestError, ResponseBody};
use crate::runtime::Timer;

/// Final state of a call. `body` is only set on success, `error` only on
/// failure; `response` is whatever the last attempt received.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub error: Option<RequestError>,
    pub response: Option<HttpResponse>,
    pub body: Option<ResponseBody>,
    /// Number of attempts made, at least 1.
    pub attempts: u32,
}

impl Completion {
    pub fn failure(error: RequestError, response: Option<HttpResponse>, attempts: u32) -> Self {
        Self {
            error: Some(error),
            response,
            body: None,
            attempts,
        }
    }

    /// Completes with whatever a successful or terminal attempt produced.
    fn finish(result: AttemptResult, attempts: u32) -> Self {
        match result {
            AttemptResult::Response(response) => Self {
                error: None,
                body: Some(response.body.clone()),
                response: Some(response),
                attempts,
            },
            AttemptResult::Error(error) => Self::failure(error, None, attempts),
            AttemptResult::Failed { response, error } => {
                Self::failure(error, Some(response), attempts)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<(HttpResponse, ResponseBody), RequestError> {
        match self {
            Completion {
                error: Some(error), ..
            } => Err(error),
            Completion {
                response: Some(response),
                body: Some(body),
                ..
            } => Ok((response, body)),
            _ => Err(RequestError::Client {
                message: "completed without a response".to_string(),
            }),
        }
    }
}

/// Runs attempts strictly one after another, sleeping on `timer` between
/// them. Each run owns its own attempt counter.
pub struct Scheduler<'a, T: Timer + ?Sized> {
    policy: &'a RetryPolicy,
    timer: &'a T,
}

impl<'a, T: Timer + ?Sized> Scheduler<'a, T> {
    pub fn new(policy: &'a RetryPolicy, timer: &'a T) -> Self {
        Self { policy, timer }
    }

    /// Calls `attempt_fn(n)` for `n = 1, 2, ...` until the outcome is final.
    pub async fn run<F, Fut>(&self, mut attempt_fn: F) -> Completion
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptResult>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            debug!("Attempt {}/{}...", attempt, max_attempts);
            let result = attempt_fn(attempt).await;

            let retry = match classify(&result) {
                Outcome::Retry(reason) => Some(reason),
                Outcome::Success(_) | Outcome::Terminal(_) => None,
            };
            let Some(reason) = retry else {
                let completion = Completion::finish(result, attempt);
                match &completion.error {
                    Some(e) => debug!("Attempt {} failed, not retrying: {}", attempt, e),
                    None => debug!("Attempt {} succeeded", attempt),
                }
                return completion;
            };

            if !self.policy.allows_retry_after(attempt) {
                warn!(
                    "Giving up after {} attempt(s), last failure: {}",
                    attempt, reason
                );
                let (response, error) = result.into_parts();
                let error = error.unwrap_or_else(|| reason.into_error());
                return Completion::failure(error, response, attempt);
            }

            let delay = self.policy.delay(attempt);
            warn!(
                "Attempt {}/{} failed ({}), retrying in {}ms...",
                attempt,
                max_attempts,
                reason,
                delay.as_millis()
            );
            self.timer.sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorCode;
    use crate::runtime::MockTimer;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn response(status: u16) -> AttemptResult {
        AttemptResult::from_response(HttpResponse::with_status(status, ResponseBody::Empty))
    }

    fn refused() -> AttemptResult {
        AttemptResult::Error(RequestError::network(
            Some(ErrorCode::ConnectionRefused),
            "connect failed",
        ))
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::with_max_retries(Some(max_retries))
    }

    /// Timer that records requested delays and returns immediately.
    fn recording_timer() -> (MockTimer, Arc<Mutex<Vec<Duration>>>) {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&delays);
        let mut timer = MockTimer::new();
        timer
            .expect_sleep()
            .returning(move |d| recorded.lock().unwrap().push(d));
        (timer, delays)
    }

    /// Replays `results` in order and counts calls.
    async fn run_sequence(
        policy: &RetryPolicy,
        timer: &MockTimer,
        results: Vec<AttemptResult>,
    ) -> (Completion, Vec<u32>) {
        let results = Mutex::new(results.into_iter());
        let seen = Mutex::new(Vec::new());
        let completion = Scheduler::new(policy, timer)
            .run(|n| {
                seen.lock().unwrap().push(n);
                let next = results.lock().unwrap().next().expect("ran out of results");
                async move { next }
            })
            .await;
        let seen = seen.into_inner().unwrap();
        (completion, seen)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let mut timer = MockTimer::new();
        timer.expect_sleep().never();

        let ok = AttemptResult::Response(HttpResponse::with_status(
            200,
            ResponseBody::Json(json!({"ok": true})),
        ));
        let (completion, seen) = run_sequence(&policy(5), &timer, vec![ok]).await;

        assert_eq!(seen, vec![1]);
        assert!(completion.is_success());
        assert_eq!(completion.body, Some(ResponseBody::Json(json!({"ok": true}))));
        assert_eq!(completion.response.unwrap().status.as_u16(), 200);
        assert_eq!(completion.attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let (timer, delays) = recording_timer();
        let ok = AttemptResult::Response(HttpResponse::with_status(200, ResponseBody::Empty));

        let (completion, seen) =
            run_sequence(&policy(5), &timer, vec![response(503), refused(), ok]).await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert!(completion.is_success());
        assert_eq!(completion.body, Some(ResponseBody::Empty));
        assert_eq!(delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_failure_stops_immediately() {
        let mut timer = MockTimer::new();
        timer.expect_sleep().never();

        let (completion, seen) = run_sequence(&policy(5), &timer, vec![response(404)]).await;

        assert_eq!(seen, vec![1]);
        assert_eq!(completion.error.as_ref().and_then(RequestError::status), Some(404));
        assert_eq!(completion.response.unwrap().status.as_u16(), 404);
        assert!(completion.body.is_none());
    }

    #[tokio::test]
    async fn test_non_retriable_network_error_is_terminal() {
        let mut timer = MockTimer::new();
        timer.expect_sleep().never();

        let aborted = AttemptResult::Error(RequestError::network(
            Some(ErrorCode::ConnectionAborted),
            "aborted",
        ));
        let (completion, seen) = run_sequence(&policy(5), &timer, vec![aborted]).await;

        assert_eq!(seen, vec![1]);
        assert_eq!(
            completion.error.and_then(|e| e.code()),
            Some(ErrorCode::ConnectionAborted)
        );
        assert!(completion.response.is_none());
    }

    #[tokio::test]
    async fn test_exhaustion_makes_n_plus_one_attempts() {
        for n in [0u32, 1, 3, 6] {
            let (timer, delays) = recording_timer();
            let results = (0..=n).map(|_| refused()).collect();

            let (completion, seen) = run_sequence(&policy(n), &timer, results).await;

            assert_eq!(seen, (1..=n + 1).collect::<Vec<_>>());
            assert_eq!(completion.attempts, n + 1);
            assert_eq!(delays.lock().unwrap().len(), n as usize);
            assert_eq!(
                completion.error.and_then(|e| e.code()),
                Some(ErrorCode::ConnectionRefused)
            );
            assert!(completion.response.is_none());
            assert!(completion.body.is_none());
        }
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_failure() {
        let (timer, _) = recording_timer();
        let results = vec![refused(), response(500), response(502)];

        let (completion, _) = run_sequence(&policy(2), &timer, results).await;

        assert_eq!(completion.error.unwrap().to_string(), "502 - Bad Gateway");
        assert_eq!(completion.response.unwrap().status.as_u16(), 502);
        assert!(completion.body.is_none());
    }

    #[tokio::test]
    async fn test_exhaustion_without_error_synthesizes_status_error() {
        let (timer, _) = recording_timer();
        let bare = AttemptResult::Response(HttpResponse::with_status(503, ResponseBody::Empty));

        let (completion, _) = run_sequence(&policy(0), &timer, vec![bare]).await;

        assert_eq!(
            completion.error,
            Some(RequestError::Status {
                status: 503,
                status_text: "Service Unavailable".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let mut timer = MockTimer::new();
        timer.expect_sleep().never();

        let (completion, seen) = run_sequence(&policy(0), &timer, vec![response(429)]).await;

        assert_eq!(seen, vec![1]);
        assert_eq!(completion.error.and_then(|e| e.status()), Some(429));
    }

    #[tokio::test]
    async fn test_delays_follow_backoff_bounds() {
        let (timer, delays) = recording_timer();
        let policy = policy(10);
        let results = (0..=10).map(|_| response(503)).collect();

        run_sequence(&policy, &timer, results).await;

        let delays = delays.lock().unwrap();
        assert_eq!(delays.len(), 10);
        for (i, delay) in delays.iter().enumerate() {
            let k = i as i32;
            let lower_ms = (500.0 * 2f64.powi(k) * 0.5).min(60_000.0);
            assert!(*delay <= policy.max_delay, "delay {} = {:?}", k + 1, delay);
            assert!(
                delay.as_secs_f64() * 1000.0 >= lower_ms - 1e-6,
                "delay {} = {:?}",
                k + 1,
                delay
            );
        }
    }

    #[test]
    fn test_completion_into_result() {
        let ok = Completion::finish(
            AttemptResult::Response(HttpResponse::with_status(200, ResponseBody::Empty)),
            1,
        );
        let (response, body) = ok.into_result().unwrap();
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(body, ResponseBody::Empty);

        let failed = Completion::failure(RequestError::network(None, "x"), None, 2);
        assert!(!failed.is_success());
        assert!(failed.into_result().is_err());
    }
}
