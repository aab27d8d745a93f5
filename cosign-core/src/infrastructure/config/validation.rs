use crate::foundation::MAX_CALL_PAYLOAD_BYTES;
use crate::infrastructure::config::types::AppConfig;

const MAX_RETRY_ATTEMPTS: u32 = 10;

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.ledger.chain_id == 0 {
            errors.push("ledger.chain_id must be > 0".to_string());
        }
        if self.ledger.call_timeout_ms == 0 {
            errors.push("ledger.call_timeout_ms must be > 0".to_string());
        }
        if self.ledger.submit_timeout_ms == 0 {
            errors.push("ledger.submit_timeout_ms must be > 0".to_string());
        }

        let retry = &self.ledger.retry;
        if retry.attempts == 0 {
            errors.push("ledger.retry.attempts must be >= 1".to_string());
        }
        if retry.attempts > MAX_RETRY_ATTEMPTS {
            errors.push(format!("ledger.retry.attempts should not exceed {}", MAX_RETRY_ATTEMPTS));
        }
        if retry.multiplier == 0 {
            errors.push("ledger.retry.multiplier must be >= 1".to_string());
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            errors.push("ledger.retry.max_delay_ms cannot be below base_delay_ms".to_string());
        }

        let breaker = &self.ledger.circuit_breaker;
        if breaker.failure_threshold == 0 {
            errors.push("ledger.circuit_breaker.failure_threshold must be > 0".to_string());
        }
        if breaker.success_threshold == 0 {
            errors.push("ledger.circuit_breaker.success_threshold must be > 0".to_string());
        }

        if self.pool.max_pending_per_account == 0 {
            errors.push("pool.max_pending_per_account must be > 0".to_string());
        }
        if self.pool.max_call_payload_bytes == 0 || self.pool.max_call_payload_bytes > MAX_CALL_PAYLOAD_BYTES {
            errors.push(format!("pool.max_call_payload_bytes must be within 1..={}", MAX_CALL_PAYLOAD_BYTES));
        }

        for filter in &self.logging.filters {
            let level = filter.split_once('=').map(|(_, level)| level).unwrap_or(filter.as_str());
            if level.trim().parse::<log::LevelFilter>().is_err() {
                errors.push(format!("invalid logging.filters entry: {}", filter));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
