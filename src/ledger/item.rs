use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default label for a funded item entered without a description.
pub const DEFAULT_DESCRIPTION: &str = "miscellaneous";
/// Default label for a $0 placeholder item.
pub const PLACEHOLDER_DESCRIPTION: &str = "no contributions";

/// A single labeled contribution owned by one contributor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
}

impl Item {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.amount <= 0.0
    }

    /// Key used for duplicate detection within a contributor.
    pub fn normalized_description(&self) -> String {
        normalize_label(&self.description)
    }
}

/// Trims and case-folds a name or description for comparisons.
pub fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Applies the description defaulting rule for an amount.
pub fn resolve_description(description: &str, amount: f64) -> String {
    let trimmed = description.trim();
    if !trimmed.is_empty() {
        trimmed.to_string()
    } else if amount > 0.0 {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        PLACEHOLDER_DESCRIPTION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_descriptions_default_by_amount() {
        assert_eq!(resolve_description("  ", 12.0), DEFAULT_DESCRIPTION);
        assert_eq!(resolve_description("", 0.0), PLACEHOLDER_DESCRIPTION);
        assert_eq!(resolve_description(" Taxi ", 8.0), "Taxi");
    }

    #[test]
    fn normalization_ignores_case_and_padding() {
        let item = Item::new("  Lunch ", 20.0);
        assert_eq!(item.normalized_description(), "lunch");
        assert_eq!(normalize_label("ALEX"), normalize_label(" alex"));
    }
}
