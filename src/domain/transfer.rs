use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

pub type TransferId = i64;

/// A directed movement of money between two accounts.
/// Transfers are immutable; the amount is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Debited account
    pub from_account_id: AccountId,
    /// Credited account
    pub to_account_id: AccountId,
    pub amount: Cents,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// The signed amount this transfer contributes to `account_id`.
    pub fn effect_on(&self, account_id: AccountId) -> Cents {
        if account_id == self.from_account_id {
            -self.amount
        } else if account_id == self.to_account_id {
            self.amount
        } else {
            0
        }
    }
}
