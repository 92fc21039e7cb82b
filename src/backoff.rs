use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

use crate::errors::Error;

/// Retry budget for transient transport failures.
///
/// Applies to connection errors and throttling/unavailable statuses on
/// ordinary requests; the credential refresh call is deliberately outside
/// this budget.
#[derive(Clone, Debug)]
pub struct BackoffPlan {
    pub max_attempts: u8,
    pub base_delay: Duration,
    pub factor: f64,
    pub cap: Duration,
}

impl BackoffPlan {
    pub fn new(
        max_attempts: u8,
        base_delay: Duration,
        factor: f64,
        cap: Duration,
    ) -> Result<Self, Error> {
        if max_attempts == 0 {
            return Err(Error::Config("Backoff needs at least one attempt".into()));
        }
        if factor < 1.0 {
            return Err(Error::Config(
                "Backoff factor below 1.0 would shrink delays".into(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            factor,
            cap,
        })
    }

    pub fn default_plan() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            factor: 2.0,
            cap: Duration::from_secs(3),
        }
    }

    /// Delay before the given attempt (attempt 2 is the first re-send).
    /// Equal jitter keeps concurrent retries from stampeding in lockstep.
    pub fn delay_for_attempt(&self, attempt: u8, rng: &mut impl Rng) -> Duration {
        let exp = self.factor.powi(attempt.saturating_sub(2) as i32);
        let ceiling = self.base_delay.mul_f64(exp).min(self.cap);
        ceiling.mul_f64(rng.gen_range(0.5..=1.0))
    }
}

/// Statuses worth re-sending: throttling and transient gateway failures.
pub(crate) fn transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

pub(crate) fn transient_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use reqwest::StatusCode;

    use super::{BackoffPlan, transient_status};

    #[test]
    fn delays_grow_but_never_exceed_cap() {
        let plan = BackoffPlan::default_plan();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 2..=6 {
            let delay = plan.delay_for_attempt(attempt, &mut rng);
            assert!(delay <= plan.cap, "attempt {} delay {:?} over cap", attempt, delay);
            assert!(delay >= plan.base_delay.mul_f64(0.5));
        }
    }

    #[test]
    fn validation_rejects_degenerate_plans() {
        let err = BackoffPlan::new(0, Duration::from_millis(100), 2.0, Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("at least one attempt"));

        let err = BackoffPlan::new(3, Duration::from_millis(100), 0.5, Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("shrink"));
    }

    #[test]
    fn transient_statuses_are_throttle_and_gateway_failures() {
        assert!(transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!transient_status(StatusCode::UNAUTHORIZED));
        assert!(!transient_status(StatusCode::NOT_FOUND));
        assert!(!transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
