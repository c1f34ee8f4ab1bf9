//! Retry loop: run a closure until success or policy says stop.

use super::policy::{RetryDecision, RetryPolicy};

/// Returned when every attempt failed; carries the last error.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs a closure until it succeeds or the retry policy says to stop.
/// `on_failure` sees every failed attempt (1-based) before the backoff sleep,
/// including the last one.
pub fn run_with_retry<T, E, F, L>(
    policy: &RetryPolicy,
    mut f: F,
    mut on_failure: L,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Result<T, E>,
    L: FnMut(u32, &E),
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                on_failure(attempt, &e);
                match policy.decide(attempt) {
                    RetryDecision::NoRetry => {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        })
                    }
                    RetryDecision::RetryAfter(d) => {
                        if !d.is_zero() {
                            std::thread::sleep(d);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
