use std::fmt;

use uuid::Uuid;

use crate::ledger::{Allocation, Contributor, Item, ItemRef, MIN_SHARE_WEIGHT};

/// Addresses one editable entity inside a batch edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Contributor(Uuid),
    Item(ItemRef),
}

impl EntityKey {
    pub fn item(contributor: Uuid, item: Uuid) -> Self {
        EntityKey::Item(ItemRef { contributor, item })
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Contributor(id) => write!(f, "contributor {id}"),
            EntityKey::Item(reference) => {
                write!(f, "item {} of contributor {}", reference.item, reference.contributor)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    Share,
    Fixed,
}

/// Editable copy of a contributor's fields.
///
/// Both the weight and the fixed amount are kept while editing so toggling the
/// mode back and forth does not lose what was typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorDraft {
    pub name: String,
    pub mode: AllocationMode,
    pub share_weight: u8,
    pub fixed_amount: f64,
}

impl ContributorDraft {
    pub fn from_contributor(contributor: &Contributor) -> Self {
        let (mode, share_weight, fixed_amount) = match contributor.allocation {
            Allocation::Share { weight } => (AllocationMode::Share, weight, 0.0),
            Allocation::Fixed { amount } => (AllocationMode::Fixed, MIN_SHARE_WEIGHT, amount),
        };
        Self {
            name: contributor.name.clone(),
            mode,
            share_weight,
            fixed_amount,
        }
    }

    pub fn allocation(&self) -> Allocation {
        match self.mode {
            AllocationMode::Share => Allocation::share(self.share_weight),
            AllocationMode::Fixed => Allocation::fixed(self.fixed_amount),
        }
    }

    pub fn apply(&mut self, patch: ContributorPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(weight) = patch.share_weight {
            self.share_weight = weight;
        }
        if let Some(amount) = patch.fixed_amount {
            self.fixed_amount = amount;
        }
    }
}

/// Editable copy of an item's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub description: String,
    pub amount: f64,
}

impl ItemDraft {
    pub fn from_item(item: &Item) -> Self {
        Self {
            description: item.description.clone(),
            amount: item.amount,
        }
    }

    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributorPatch {
    pub name: Option<String>,
    pub mode: Option<AllocationMode>,
    pub share_weight: Option<u8>,
    pub fixed_amount: Option<f64>,
}

impl ContributorPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn share(weight: u8) -> Self {
        Self {
            mode: Some(AllocationMode::Share),
            share_weight: Some(weight),
            ..Self::default()
        }
    }

    pub fn fixed(amount: f64) -> Self {
        Self {
            mode: Some(AllocationMode::Fixed),
            fixed_amount: Some(amount),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
}

impl ItemPatch {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn amount(amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }
}

/// A partial update staged against one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Contributor(ContributorPatch),
    Item(ItemPatch),
}

impl From<ContributorPatch> for Patch {
    fn from(patch: ContributorPatch) -> Self {
        Patch::Contributor(patch)
    }
}

impl From<ItemPatch> for Patch {
    fn from(patch: ItemPatch) -> Self {
        Patch::Item(patch)
    }
}
