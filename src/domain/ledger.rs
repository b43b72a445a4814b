use serde::{Deserialize, Serialize};

use super::{Cents, Entry};

/// Raw counters gathered from storage for an integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub account_count: i64,
    pub transfer_count: i64,
    pub entry_count: i64,
    /// Sum of every entry amount in the ledger
    pub entry_total: Cents,
    /// Transfers whose amount is zero or negative
    pub invalid_amounts: i64,
    /// Transfers whose source and destination are the same account
    pub self_transfers: i64,
    /// Entries or transfers pointing at accounts that no longer exist
    pub dangling_refs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Every transfer writes exactly two entries
    EntryCountMismatch { expected: i64, actual: i64 },
    /// Entries are balanced pairs, so they must sum to zero
    UnbalancedEntries { total: Cents },
    InvalidAmounts { count: i64 },
    SelfTransfers { count: i64 },
    DanglingReferences { count: i64 },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::EntryCountMismatch { expected, actual } => {
                write!(f, "expected {} entries, found {}", expected, actual)
            }
            IntegrityIssue::UnbalancedEntries { total } => {
                write!(f, "entries sum to {} instead of 0", total)
            }
            IntegrityIssue::InvalidAmounts { count } => {
                write!(f, "{} transfers with a non-positive amount", count)
            }
            IntegrityIssue::SelfTransfers { count } => {
                write!(f, "{} transfers from an account to itself", count)
            }
            IntegrityIssue::DanglingReferences { count } => {
                write!(f, "{} rows reference missing accounts", count)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub stats: LedgerStats,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: LedgerStats) -> IntegrityReport {
    let mut issues = Vec::new();

    let expected_entries = stats.transfer_count * 2;
    if stats.entry_count != expected_entries {
        issues.push(IntegrityIssue::EntryCountMismatch {
            expected: expected_entries,
            actual: stats.entry_count,
        });
    }
    if stats.entry_total != 0 {
        issues.push(IntegrityIssue::UnbalancedEntries {
            total: stats.entry_total,
        });
    }
    if stats.invalid_amounts > 0 {
        issues.push(IntegrityIssue::InvalidAmounts {
            count: stats.invalid_amounts,
        });
    }
    if stats.self_transfers > 0 {
        issues.push(IntegrityIssue::SelfTransfers {
            count: stats.self_transfers,
        });
    }
    if stats.dangling_refs > 0 {
        issues.push(IntegrityIssue::DanglingReferences {
            count: stats.dangling_refs,
        });
    }

    IntegrityReport { stats, issues }
}

/// Net effect of a set of entries on the accounts they reference.
pub fn sum_entries(entries: &[Entry]) -> Cents {
    entries.iter().map(|e| e.amount).sum()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn entry(account_id: i64, amount: Cents) -> Entry {
        Entry {
            id: 0,
            account_id,
            amount,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_clean_ledger_has_no_issues() {
        let report = build_integrity_report(LedgerStats {
            account_count: 2,
            transfer_count: 3,
            entry_count: 6,
            ..Default::default()
        });

        assert!(report.is_ok());
    }

    #[test]
    fn test_extra_entry_is_reported() {
        // A duplicated credit entry leaves the ledger both miscounted and unbalanced
        let report = build_integrity_report(LedgerStats {
            account_count: 2,
            transfer_count: 1,
            entry_count: 3,
            entry_total: 30,
            ..Default::default()
        });

        assert_eq!(
            report.issues,
            vec![
                IntegrityIssue::EntryCountMismatch {
                    expected: 2,
                    actual: 3
                },
                IntegrityIssue::UnbalancedEntries { total: 30 },
            ]
        );
    }

    #[test]
    fn test_sum_entries() {
        let entries = vec![entry(1, -30), entry(2, 30), entry(1, 200)];
        assert_eq!(sum_entries(&entries), 200);
        assert_eq!(sum_entries(&[]), 0);
    }
}
