//! Cross-source merge of holdings-derived and transaction-derived account
//! records sharing an account number.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::{Account, AccountRecord};

/// Recursively merges `overlay` into `base`.
///
/// Objects merge key by key, any other overlay value replaces the base
/// value wholesale, and a `null` overlay never erases a present value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = deep_merge(current, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merges two records for the same account; `overlay` wins on collisions.
pub fn merge_records(base: AccountRecord, overlay: AccountRecord) -> AccountRecord {
    let details = match deep_merge(
        Value::Object(base.account.details),
        Value::Object(overlay.account.details),
    ) {
        Value::Object(details) => details,
        _ => serde_json::Map::new(),
    };

    AccountRecord {
        account: Account {
            institution: overlay.account.institution,
            uuid: overlay.account.uuid,
            number: overlay.account.number,
            details,
        },
        positions: overlay.positions.or(base.positions),
        normalized_positions: overlay.normalized_positions.or(base.normalized_positions),
        balances: match (base.balances, overlay.balances) {
            (Some(base), Some(overlay)) => Some(deep_merge(base, overlay)),
            (base, overlay) => overlay.or(base),
        },
        activities: overlay.activities.or(base.activities),
        normalized_transactions: overlay.normalized_transactions.or(base.normalized_transactions),
    }
}

/// Joins both collections by `account.number` into one record per account.
///
/// Output keeps holdings-derived accounts in input order followed by
/// accounts that only appear on the transaction side.
pub fn reconcile(holdings: Vec<AccountRecord>, transactions: Vec<AccountRecord>) -> Vec<AccountRecord> {
    let mut merged: Vec<AccountRecord> = Vec::with_capacity(holdings.len() + transactions.len());
    let mut index_by_number: HashMap<String, usize> = HashMap::new();

    for record in holdings.into_iter().chain(transactions) {
        match index_by_number.get(&record.account.number) {
            Some(&index) => {
                debug!(account = %record.account.number, "merging account records");
                let slot = &mut merged[index];
                let base = std::mem::replace(slot, AccountRecord::new(record.account.clone()));
                *slot = merge_records(base, record);
            }
            None => {
                index_by_number.insert(record.account.number.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}
