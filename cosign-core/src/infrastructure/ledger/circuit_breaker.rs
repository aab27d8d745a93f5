use crate::foundation::CIRCUIT_BREAKER_BASE_BACKOFF_SECS;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const MAX_BACKOFF_SHIFT: u32 = 30;
const JITTER_BUCKETS: u64 = 41;
const JITTER_HALF_RANGE: i64 = 20;
const JITTER_PERCENT_TO_PPM: i64 = 10_000;
const PPM: i64 = 1_000_000;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Upper bound of the open window (seconds).
    #[serde(default = "default_open_duration_secs")]
    pub open_duration_secs: u64,
    /// Half-open successes required to close again.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_open_duration_secs() -> u64 {
    30
}

const fn default_success_threshold() -> u32 {
    1
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_duration_secs: default_open_duration_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum State {
    Closed { failures: u32 },
    Open { until: Instant, trips: u32 },
    HalfOpen { successes: u32, trips: u32 },
}

/// Closed/Open/HalfOpen breaker guarding one ledger method.
pub struct CircuitBreaker {
    method: &'static str,
    cfg: CircuitBreakerConfig,
    state: parking_lot::Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(method: &'static str, cfg: CircuitBreakerConfig) -> Self {
        Self { method, cfg, state: parking_lot::Mutex::new(State::Closed { failures: 0 }) }
    }

    pub fn state(&self) -> BreakerState {
        match *self.state.lock() {
            State::Closed { .. } => BreakerState::Closed,
            State::Open { .. } => BreakerState::Open,
            State::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Whether a call may proceed. An expired open window moves to half-open.
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut guard = self.state.lock();
        let State::Open { until, trips } = *guard else {
            return true;
        };
        if now < until {
            debug!(
                "ledger circuit open; rejecting call method={} retry_in_ms={} trips={}",
                self.method,
                until.saturating_duration_since(now).as_millis(),
                trips
            );
            return false;
        }
        info!("ledger circuit half-open method={} trips={}", self.method, trips);
        *guard = State::HalfOpen { successes: 0, trips };
        true
    }

    pub fn record_success(&self) {
        let mut guard = self.state.lock();
        match *guard {
            State::Closed { .. } => *guard = State::Closed { failures: 0 },
            State::HalfOpen { successes, trips } => {
                let successes = successes.saturating_add(1);
                if successes >= self.cfg.success_threshold.max(1) {
                    info!("ledger circuit closed method={} successes={}", self.method, successes);
                    *guard = State::Closed { failures: 0 };
                } else {
                    *guard = State::HalfOpen { successes, trips };
                }
            }
            State::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.state.lock();
        let trips = match *guard {
            State::Closed { failures } => {
                let failures = failures.saturating_add(1);
                if failures < self.cfg.failure_threshold.max(1) {
                    debug!(
                        "ledger call failed method={} failures={} threshold={}",
                        self.method, failures, self.cfg.failure_threshold
                    );
                    *guard = State::Closed { failures };
                    return;
                }
                1
            }
            State::HalfOpen { trips, .. } => trips.saturating_add(1),
            State::Open { .. } => return,
        };
        let window = self.open_window(trips);
        warn!("ledger circuit opened method={} open_for_ms={} trips={}", self.method, window.as_millis(), trips);
        *guard = State::Open { until: Instant::now() + window, trips };
    }

    fn open_window(&self, trips: u32) -> Duration {
        let base = Duration::from_secs(CIRCUIT_BREAKER_BASE_BACKOFF_SECS);
        let max = Duration::from_secs(self.cfg.open_duration_secs.max(1));
        let shift = trips.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        let exp = base.checked_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX)).unwrap_or(max).min(max);

        // ±20% jitter from wall-clock nanos.
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| u64::from(d.subsec_nanos())).unwrap_or(0);
        let bucket = (nanos % JITTER_BUCKETS) as i64 - JITTER_HALF_RANGE;
        let ppm = PPM + bucket * JITTER_PERCENT_TO_PPM;
        let jittered_ms = (exp.as_millis() as i64).saturating_mul(ppm) / PPM;
        Duration::from_millis(jittered_ms.max(1) as u64)
    }
}
