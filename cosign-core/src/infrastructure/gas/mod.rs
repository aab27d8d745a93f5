//! Gas estimation seam. The core requests estimates and never computes gas itself.

use crate::domain::Operation;
use crate::foundation::Result;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas_limit: u64,
    /// Price per gas unit in the ledger's smallest denomination.
    pub gas_price: u128,
}

impl GasEstimate {
    pub fn total_cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.gas_price)
    }
}

#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate(&self, account: Address, operation: &Operation) -> Result<GasEstimate>;
}

/// Linear estimate: `base + per_byte * len(data)`.
#[derive(Clone, Copy, Debug)]
pub struct FixedGasEstimator {
    pub base: u64,
    pub per_byte: u64,
    pub gas_price: u128,
}

impl Default for FixedGasEstimator {
    fn default() -> Self {
        Self { base: 60_000, per_byte: 16, gas_price: 1_000_000_000 }
    }
}

#[async_trait]
impl GasEstimator for FixedGasEstimator {
    async fn estimate(&self, _account: Address, operation: &Operation) -> Result<GasEstimate> {
        let payload = operation.data.len() as u64;
        Ok(GasEstimate {
            gas_limit: self.base.saturating_add(self.per_byte.saturating_mul(payload)),
            gas_price: self.gas_price,
        })
    }
}
