//! Wallet balance port
//!
//! Queried once at supervisor initialization; a `None` balance makes the
//! supervisor fall back to the configured initial capital.

use async_trait::async_trait;

/// Port for querying an account balance in capital units
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Current balance, `None` if unavailable.
    async fn get_balance(&self) -> Option<f64>;
}

/// Wallet with a fixed balance, used for paper runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticWallet {
    balance: Option<f64>,
}

impl StaticWallet {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: Some(balance),
        }
    }

    /// A wallet that always reports its balance as unavailable.
    pub fn unavailable() -> Self {
        Self { balance: None }
    }
}

#[async_trait]
impl WalletPort for StaticWallet {
    async fn get_balance(&self) -> Option<f64> {
        self.balance
    }
}
