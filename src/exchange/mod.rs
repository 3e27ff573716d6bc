//! JSON import/export of contributor records.
//!
//! Records use the interchange field names (`use_share`, `by_amount`,
//! `by_share`, `items[].value`). An import is all-or-nothing: the first bad
//! record aborts it with the offending contributor and item index.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::currency::{format_plain, has_whole_cents, normalize_amount, parse_strict_amount};
use crate::errors::ValidationError;
use crate::ledger::contributor::validate_share_weight;
use crate::ledger::{normalize_label, Allocation, Contributor, Item, LedgerStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContributorRecord {
    pub name: String,
    pub use_share: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_share: Option<u8>,
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub description: String,
    pub value: f64,
}

/// Maps the store's contributors to interchange records.
pub fn export_records(store: &LedgerStore) -> Vec<ContributorRecord> {
    store
        .contributors()
        .iter()
        .map(|contributor| {
            let (use_share, by_amount, by_share) = match contributor.allocation {
                Allocation::Share { weight } => (true, 0.0, weight),
                Allocation::Fixed { amount } => (false, amount, 1),
            };
            ContributorRecord {
                name: contributor.name.clone(),
                use_share,
                by_amount: Some(format_plain(by_amount)),
                by_share: Some(by_share),
                items: contributor
                    .items
                    .iter()
                    .map(|item| ItemRecord {
                        description: item.description.clone(),
                        value: item.amount,
                    })
                    .collect(),
            }
        })
        .collect()
}

pub fn export_json(store: &LedgerStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_records(store))
}

/// Parses and validates an import payload without touching any store.
pub fn parse_import(json: &str) -> Result<Vec<Contributor>, ValidationError> {
    let payload: Value =
        serde_json::from_str(json).map_err(|err| ValidationError::MalformedImport(err.to_string()))?;
    let Value::Array(entries) = payload else {
        return Err(ValidationError::MalformedImport(
            "expected an array of contributor records".into(),
        ));
    };
    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let record: ContributorRecord =
            serde_json::from_value(entry).map_err(|err| record_error(index, None, err))?;
        records.push(record);
    }
    records_to_contributors(&records)
}

/// Validates records and converts them to contributors.
pub fn records_to_contributors(
    records: &[ContributorRecord],
) -> Result<Vec<Contributor>, ValidationError> {
    let mut names = HashSet::new();
    let mut contributors = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let contributor = record_to_contributor(index, record)?;
        if !names.insert(contributor.normalized_name()) {
            return Err(record_error(
                index,
                None,
                format!("duplicate name `{}`", contributor.name),
            ));
        }
        contributors.push(contributor);
    }
    Ok(contributors)
}

/// Replaces the store contents with an imported payload.
pub fn import_json(store: &mut LedgerStore, json: &str) -> Result<usize, ValidationError> {
    let contributors = parse_import(json)?;
    let count = contributors.len();
    store.replace_all(contributors)?;
    info!(contributors = count, "imported ledger");
    Ok(count)
}

fn record_to_contributor(
    index: usize,
    record: &ContributorRecord,
) -> Result<Contributor, ValidationError> {
    let name = record.name.trim();
    if name.is_empty() {
        return Err(record_error(index, None, "name is blank"));
    }

    let fixed = record
        .by_amount
        .as_deref()
        .map(parse_strict_amount)
        .transpose()
        .map_err(|err| record_error(index, None, format!("by_amount: {err}")))?;
    let weight = record
        .by_share
        .map(|weight| validate_share_weight(weight).map(|_| weight))
        .transpose()
        .map_err(|err| record_error(index, None, format!("by_share: {err}")))?;
    let allocation = if record.use_share {
        Allocation::share(weight.ok_or_else(|| record_error(index, None, "by_share is required"))?)
    } else {
        Allocation::fixed(fixed.ok_or_else(|| record_error(index, None, "by_amount is required"))?)
    };

    if record.items.is_empty() {
        return Err(record_error(index, None, "at least one item is required"));
    }
    let mut contributor = Contributor::new(name, allocation);
    let mut descriptions = HashSet::new();
    for (item_index, item) in record.items.iter().enumerate() {
        let description = item.description.trim();
        if description.is_empty() {
            return Err(record_error(index, Some(item_index), "description is blank"));
        }
        let value = normalize_amount(item.value)
            .map_err(|err| record_error(index, Some(item_index), err))?;
        if !has_whole_cents(item.value) {
            return Err(record_error(
                index,
                Some(item_index),
                "value has more than two decimals",
            ));
        }
        if !descriptions.insert(normalize_label(description)) {
            return Err(record_error(
                index,
                Some(item_index),
                format!("duplicate description `{description}`"),
            ));
        }
        contributor.items.push(Item::new(description, value));
    }
    Ok(contributor)
}

fn record_error(
    contributor: usize,
    item: Option<usize>,
    reason: impl ToString,
) -> ValidationError {
    ValidationError::MalformedRecord {
        contributor,
        item,
        reason: reason.to_string(),
    }
}
