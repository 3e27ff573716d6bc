use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{normalize_label, Item};
use crate::errors::ValidationError;

pub const MIN_SHARE_WEIGHT: u8 = 1;
pub const MAX_SHARE_WEIGHT: u8 = 10;

/// How a contributor's obligation is computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Allocation {
    /// Proportional slice of whatever the fixed payers leave over.
    Share { weight: u8 },
    /// Absolute amount taken off the total before shares are computed.
    Fixed { amount: f64 },
}

impl Allocation {
    pub fn share(weight: u8) -> Self {
        Allocation::Share { weight }
    }

    pub fn fixed(amount: f64) -> Self {
        Allocation::Fixed { amount }
    }

    pub fn is_share(&self) -> bool {
        matches!(self, Allocation::Share { .. })
    }

    pub fn share_weight(&self) -> Option<u8> {
        match self {
            Allocation::Share { weight } => Some(*weight),
            Allocation::Fixed { .. } => None,
        }
    }

    pub fn fixed_amount(&self) -> Option<f64> {
        match self {
            Allocation::Share { .. } => None,
            Allocation::Fixed { amount } => Some(*amount),
        }
    }

    /// Checks the per-contributor bounds (weight range, non-negative amount).
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            Allocation::Share { weight } => validate_share_weight(weight),
            Allocation::Fixed { amount } => {
                crate::currency::normalize_amount(amount).map(|_| ())
            }
        }
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Allocation::Share {
            weight: MIN_SHARE_WEIGHT,
        }
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allocation::Share { weight } => write!(f, "share x{weight}"),
            Allocation::Fixed { amount } => {
                write!(f, "fixed {}", crate::currency::format_amount(*amount))
            }
        }
    }
}

pub fn validate_share_weight(weight: u8) -> Result<(), ValidationError> {
    if (MIN_SHARE_WEIGHT..=MAX_SHARE_WEIGHT).contains(&weight) {
        Ok(())
    } else {
        Err(ValidationError::ShareWeightOutOfRange(weight))
    }
}

/// A named party in the split, owning one or more items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contributor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub allocation: Allocation,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Contributor {
    pub fn new(name: impl Into<String>, allocation: Allocation) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            allocation,
            items: Vec::new(),
        }
    }

    /// Sum of this contributor's item amounts.
    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.amount).sum()
    }

    pub fn is_funded(&self) -> bool {
        self.total() > 0.0
    }

    pub fn normalized_name(&self) -> String {
        normalize_label(&self.name)
    }

    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: Uuid) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Finds an item by normalized description, optionally skipping one id.
    pub fn item_by_description(&self, description: &str, exclude: Option<Uuid>) -> Option<&Item> {
        let normalized = normalize_label(description);
        self.items.iter().find(|item| {
            item.normalized_description() == normalized && exclude.map_or(true, |id| item.id != id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_accessors_follow_the_variant() {
        let share = Allocation::share(3);
        assert!(share.is_share());
        assert_eq!(share.share_weight(), Some(3));
        assert_eq!(share.fixed_amount(), None);

        let fixed = Allocation::fixed(12.5);
        assert!(!fixed.is_share());
        assert_eq!(fixed.fixed_amount(), Some(12.5));
        assert_eq!(fixed.to_string(), "fixed $12.50");
    }

    #[test]
    fn share_weight_bounds_are_inclusive() {
        assert!(Allocation::share(1).validate().is_ok());
        assert!(Allocation::share(10).validate().is_ok());
        assert_eq!(
            Allocation::share(0).validate(),
            Err(ValidationError::ShareWeightOutOfRange(0))
        );
        assert_eq!(
            Allocation::share(11).validate(),
            Err(ValidationError::ShareWeightOutOfRange(11))
        );
        assert!(Allocation::fixed(-1.0).validate().is_err());
    }

    #[test]
    fn allocation_serializes_as_tagged_variant() {
        let json = serde_json::to_string(&Allocation::fixed(5.0)).unwrap();
        assert_eq!(json, r#"{"mode":"fixed","amount":5.0}"#);
        let parsed: Allocation = serde_json::from_str(r#"{"mode":"share","weight":2}"#).unwrap();
        assert_eq!(parsed, Allocation::share(2));
    }

    #[test]
    fn description_lookup_skips_excluded_item() {
        let mut contributor = Contributor::new("Sam", Allocation::default());
        let lunch = Item::new("Lunch", 20.0);
        let lunch_id = lunch.id;
        contributor.items.push(lunch);
        assert!(contributor.item_by_description("LUNCH", None).is_some());
        assert!(contributor
            .item_by_description("lunch", Some(lunch_id))
            .is_none());
        assert_eq!(contributor.total(), 20.0);
    }
}
