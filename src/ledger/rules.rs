//! Cross-entity invariants shared by the store, batch edits, and imports.

use std::collections::HashSet;

use super::contributor::Contributor;
use super::item::normalize_label;
use crate::currency::{normalize_amount, round_cents, to_cents};
use crate::errors::ValidationError;

/// Fails when the fixed amounts would exceed the grand total.
pub fn check_fixed_bound(fixed_total: f64, total: f64) -> Result<(), ValidationError> {
    if to_cents(fixed_total) > to_cents(total) {
        Err(ValidationError::FixedAmountExceedsTotal {
            fixed: round_cents(fixed_total),
            total: round_cents(total),
        })
    } else {
        Ok(())
    }
}

/// Fails when a non-empty ledger has nobody paying by share.
pub fn check_share_present(contributors: &[Contributor]) -> Result<(), ValidationError> {
    if contributors.is_empty() || contributors.iter().any(|c| c.allocation.is_share()) {
        Ok(())
    } else {
        Err(ValidationError::NoShareContributor)
    }
}

pub fn grand_total(contributors: &[Contributor]) -> f64 {
    contributors.iter().map(Contributor::total).sum()
}

pub fn fixed_total(contributors: &[Contributor]) -> f64 {
    contributors
        .iter()
        .filter_map(|c| c.allocation.fixed_amount())
        .sum()
}

/// Per-entity checks only: names, items, descriptions, amounts, and weights.
///
/// Saved ledgers are loaded with this alone, since `remove_contributor` may
/// legitimately leave the allocation rules broken until the next edit.
pub fn validate_structure(contributors: &[Contributor]) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for contributor in contributors {
        let name = contributor.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        if !names.insert(normalize_label(name)) {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        contributor.allocation.validate()?;
        if contributor.items.is_empty() {
            return Err(ValidationError::NoItems(name.to_string()));
        }
        let mut descriptions = HashSet::new();
        for item in &contributor.items {
            normalize_amount(item.amount)?;
            if item.description.trim().is_empty() {
                return Err(ValidationError::BlankDescription(name.to_string()));
            }
            if !descriptions.insert(item.normalized_description()) {
                return Err(ValidationError::DuplicateDescription {
                    contributor: name.to_string(),
                    description: item.description.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Validates a complete contributor list, e.g. an import.
pub fn validate_contributors(contributors: &[Contributor]) -> Result<(), ValidationError> {
    validate_structure(contributors)?;
    check_fixed_bound(fixed_total(contributors), grand_total(contributors))?;
    check_share_present(contributors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Allocation, Item};

    fn contributor(name: &str, allocation: Allocation, amounts: &[f64]) -> Contributor {
        let mut contributor = Contributor::new(name, allocation);
        for (index, amount) in amounts.iter().enumerate() {
            contributor
                .items
                .push(Item::new(format!("item {index}"), *amount));
        }
        contributor
    }

    #[test]
    fn fixed_bound_compares_whole_cents() {
        assert!(check_fixed_bound(0.1 + 0.2, 0.3).is_ok());
        assert!(matches!(
            check_fixed_bound(150.0, 100.0),
            Err(ValidationError::FixedAmountExceedsTotal { .. })
        ));
    }

    #[test]
    fn empty_ledger_satisfies_share_rule() {
        assert!(check_share_present(&[]).is_ok());
        let only_fixed = vec![contributor("A", Allocation::fixed(0.0), &[5.0])];
        assert_eq!(
            check_share_present(&only_fixed),
            Err(ValidationError::NoShareContributor)
        );
    }

    #[test]
    fn structure_check_ignores_allocation_rules() {
        let only_fixed = vec![contributor("Kim", Allocation::fixed(20.0), &[5.0])];
        assert!(validate_structure(&only_fixed).is_ok());
        assert_eq!(
            validate_contributors(&only_fixed),
            Err(ValidationError::FixedAmountExceedsTotal {
                fixed: 20.0,
                total: 5.0
            })
        );
    }

    #[test]
    fn full_validation_catches_case_insensitive_duplicates() {
        let list = vec![
            contributor("Alex", Allocation::default(), &[5.0]),
            contributor("alex ", Allocation::default(), &[7.0]),
        ];
        assert_eq!(
            validate_contributors(&list),
            Err(ValidationError::DuplicateName("alex".into()))
        );
    }

    #[test]
    fn full_validation_requires_items() {
        let list = vec![contributor("Alex", Allocation::default(), &[])];
        assert_eq!(
            validate_contributors(&list),
            Err(ValidationError::NoItems("Alex".into()))
        );
    }
}
