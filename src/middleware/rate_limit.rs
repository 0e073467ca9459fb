use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::registry::{Params, parse_params};
use super::{Middleware, MiddlewareId};
use crate::error::Error;
use crate::fault::{Fault, HandlerError};
use crate::request::Request;
use crate::status::Status;

/// Fixed-window limiter: at most `calls` requests per `period`, across every
/// route the instance is attached to. Requests over the limit stop with
/// `429 Too Many Requests`.
///
/// # Shared state
///
/// The window is the one piece of state shared between concurrent requests.
/// It sits behind a `Mutex` held only for the counter update; a poisoned
/// lock is reported as an internal error.
///
/// The identity carries both parameters at full precision, e.g.
/// `rate_limit(calls=10,period=1.5s)`.
pub struct RateLimit {
    calls: u32,
    period: Duration,
    window: Mutex<Window>,
}

struct Window {
    started: Instant,
    used: u32,
}

/// Either `period_secs` or `period_ms` sets the window length.
#[derive(Deserialize)]
struct RateLimitParams {
    calls: u32,
    period_secs: Option<u64>,
    period_ms: Option<u64>,
}

impl RateLimit {
    /// Fails when `calls` or `period` is zero.
    pub fn new(calls: u32, period: Duration) -> Result<Self, Error> {
        Self::checked(calls, period).map_err(|reason| Error::InvalidMiddlewareType {
            name: "rate_limit".to_owned(),
            reason,
        })
    }

    pub(crate) fn from_params(params: &Params) -> Result<Self, String> {
        let parsed: RateLimitParams = parse_params(params)?;
        let period = match (parsed.period_secs, parsed.period_ms) {
            (Some(secs), None) => Duration::from_secs(secs),
            (None, Some(ms)) => Duration::from_millis(ms),
            _ => return Err("expected exactly one of `period_secs` or `period_ms`".to_owned()),
        };
        Self::checked(parsed.calls, period)
    }

    fn checked(calls: u32, period: Duration) -> Result<Self, String> {
        if calls == 0 || period.is_zero() {
            return Err("`calls` and the period must be greater than zero".to_owned());
        }
        Ok(Self {
            calls,
            period,
            window: Mutex::new(Window { started: Instant::now(), used: 0 }),
        })
    }
}

impl Middleware for RateLimit {
    fn identity(&self) -> MiddlewareId {
        MiddlewareId::new("rate_limit")
            .param("calls", self.calls)
            .param("period", format_args!("{:?}", self.period))
    }

    fn before(&self, _req: &mut Request) -> Result<(), HandlerError> {
        let mut window = self
            .window
            .lock()
            .map_err(|_| HandlerError::internal("rate limiter lock poisoned"))?;

        if window.started.elapsed() >= self.period {
            window.started = Instant::now();
            window.used = 0;
        }
        if window.used >= self.calls {
            return Err(Fault::new(Status::TooManyRequests).into());
        }
        window.used += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(calls: u32, period: Duration) -> RateLimit {
        match RateLimit::new(calls, period) {
            Ok(limit) => limit,
            Err(e) => panic!("{e}"),
        }
    }

    fn hit(limit: &RateLimit) -> Result<(), HandlerError> {
        limit.before(&mut Request::builder().build().unwrap())
    }

    #[test]
    fn rejects_calls_over_the_window_budget() {
        let limit = limiter(2, Duration::from_secs(60));
        assert!(hit(&limit).is_ok());
        assert!(hit(&limit).is_ok());
        assert!(matches!(
            hit(&limit),
            Err(HandlerError::Fault(f)) if f.status() == Status::TooManyRequests
        ));
    }

    #[test]
    fn window_resets_after_the_period() {
        let limit = limiter(1, Duration::from_millis(20));
        assert!(hit(&limit).is_ok());
        assert!(hit(&limit).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(hit(&limit).is_ok());
    }

    #[test]
    fn zero_budgets_are_rejected() {
        let mut params = Params::new();
        params.insert("calls".into(), 0.into());
        params.insert("period_secs".into(), 10.into());
        assert!(RateLimit::from_params(&params).is_err());

        assert!(matches!(
            RateLimit::new(0, Duration::from_secs(1)).err().unwrap(),
            Error::InvalidMiddlewareType { name, .. } if name == "rate_limit"
        ));
        assert!(RateLimit::new(5, Duration::ZERO).is_err());
    }

    #[test]
    fn sub_second_periods_keep_distinct_identities() {
        let short = limiter(1, Duration::from_millis(100)).identity();
        let long = limiter(1, Duration::from_millis(900)).identity();
        assert_ne!(short, long);
        assert_eq!(short.to_string(), "rate_limit(calls=1,period=100ms)");
        assert_eq!(short, limiter(1, Duration::from_millis(100)).identity());
    }

    #[test]
    fn period_may_be_given_in_milliseconds() {
        let mut params = Params::new();
        params.insert("calls".into(), 3.into());
        params.insert("period_ms".into(), 1500.into());
        let Ok(limit) = RateLimit::from_params(&params) else {
            panic!("period_ms should be accepted");
        };
        assert_eq!(limit.identity().to_string(), "rate_limit(calls=3,period=1.5s)");

        params.insert("period_secs".into(), 2.into());
        assert!(RateLimit::from_params(&params).is_err());
    }
}
