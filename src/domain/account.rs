use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

pub type AccountId = i64;

/// Currencies accepted when opening an account.
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["EUR", "KSH", "USD"];

pub fn is_supported_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&currency)
}

/// A balance-holding account. Only the balance changes after creation,
/// and only through balance-update operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    /// Current balance in cents. May be negative: sufficiency is not enforced here.
    pub balance: Cents,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}
