//! Owner of every contributor and item, with atomic single-entity mutations.

use tracing::{debug, warn};
use uuid::Uuid;

use super::contributor::{validate_share_weight, Allocation, Contributor};
use super::item::{normalize_label, resolve_description, Item};
use super::rules;
use super::snapshot::LedgerSnapshot;
use crate::currency::{normalize_amount, round_cents};
use crate::errors::{SessionError, ValidationError};

/// Which kind of edit currently holds the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Idle,
    Item { contributor: Uuid, item: Uuid },
    Contributor(Uuid),
    /// A batch edit session identified by its token.
    Batch(Uuid),
}

/// Identifies an item together with its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub contributor: Uuid,
    pub item: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    contributors: Vec<Contributor>,
    edit_mode: EditMode,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a saved snapshot.
    ///
    /// Only per-entity structure is checked. A ledger saved after an
    /// unconditional removal may break the allocation rules; the next mutation
    /// enforces them again.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, ValidationError> {
        rules::validate_structure(&snapshot.contributors)?;
        let mut store = Self::new();
        store.install(snapshot.contributors);
        Ok(store)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.contributors.clone())
    }

    pub fn contributors(&self) -> &[Contributor] {
        &self.contributors
    }

    pub fn contributor(&self, id: Uuid) -> Option<&Contributor> {
        self.contributors.iter().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Contributor> {
        self.position_by_name(name).map(|index| &self.contributors[index])
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    pub fn total(&self) -> f64 {
        rules::grand_total(&self.contributors)
    }

    pub fn fixed_total(&self) -> f64 {
        rules::fixed_total(&self.contributors)
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    /// Records a contribution, creating the contributor on first use.
    ///
    /// A missing amount registers a $0 placeholder. Positive amounts purge a
    /// contributor's placeholders and merge into an item with the same
    /// normalized description.
    pub fn add_contribution(
        &mut self,
        name: &str,
        description: Option<&str>,
        amount: Option<f64>,
        share_weight: u8,
    ) -> Result<ItemRef, ValidationError> {
        self.ensure_unlocked()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        let amount = normalize_amount(amount.unwrap_or(0.0))?;
        let description = description.map(str::trim).unwrap_or_default();
        if !description.is_empty() && amount == 0.0 {
            return Err(ValidationError::MissingAmount(description.to_string()));
        }
        let label = resolve_description(description, amount);

        let Some(index) = self.position_by_name(name) else {
            validate_share_weight(share_weight)?;
            let mut contributor = Contributor::new(name, Allocation::share(share_weight));
            let item = Item::new(label, amount);
            let reference = ItemRef {
                contributor: contributor.id,
                item: item.id,
            };
            contributor.items.push(item);
            debug!(contributor = %name, amount, "added contributor");
            self.contributors.push(contributor);
            return Ok(reference);
        };

        let contributor = &mut self.contributors[index];
        if amount == 0.0 && contributor.is_funded() {
            return Err(ValidationError::ZeroAmountForFundedContributor(
                contributor.name.clone(),
            ));
        }
        if amount > 0.0 {
            contributor.items.retain(|item| !item.is_placeholder());
        }
        let normalized = normalize_label(&label);
        let item_id = match contributor
            .items
            .iter_mut()
            .find(|item| item.normalized_description() == normalized)
        {
            Some(existing) => {
                existing.amount = round_cents(existing.amount + amount);
                existing.id
            }
            None => {
                let item = Item::new(label, amount);
                let id = item.id;
                contributor.items.push(item);
                id
            }
        };
        debug!(contributor = %contributor.name, amount, "recorded contribution");
        Ok(ItemRef {
            contributor: contributor.id,
            item: item_id,
        })
    }

    /// Replaces an item's description and amount.
    pub fn edit_item(
        &mut self,
        contributor_id: Uuid,
        item_id: Uuid,
        new_description: &str,
        new_amount: f64,
    ) -> Result<(), ValidationError> {
        self.ensure_unlocked()?;
        let amount = normalize_amount(new_amount)?;
        let description = new_description.trim();
        if !description.is_empty() && amount == 0.0 {
            return Err(ValidationError::MissingAmount(description.to_string()));
        }
        let label = resolve_description(description, amount);

        let total = self.total();
        let fixed_total = self.fixed_total();
        let index = self.position(contributor_id)?;
        let contributor = &self.contributors[index];
        let previous = contributor
            .item(item_id)
            .ok_or(ValidationError::UnknownItem(item_id))?
            .amount;
        if contributor.item_by_description(&label, Some(item_id)).is_some() {
            return Err(ValidationError::DuplicateDescription {
                contributor: contributor.name.clone(),
                description: label,
            });
        }
        rules::check_fixed_bound(fixed_total, total - previous + amount)?;

        if let Some(item) = self.contributors[index].item_mut(item_id) {
            item.description = label;
            item.amount = amount;
        }
        if self.edit_mode
            == (EditMode::Item {
                contributor: contributor_id,
                item: item_id,
            })
        {
            self.edit_mode = EditMode::Idle;
        }
        debug!(%contributor_id, %item_id, amount, "edited item");
        Ok(())
    }

    /// Deletes an item, dropping its contributor once no items remain.
    pub fn delete_item(
        &mut self,
        contributor_id: Uuid,
        item_id: Uuid,
    ) -> Result<(), ValidationError> {
        self.ensure_unlocked()?;
        let index = self.position(contributor_id)?;
        if self.contributors[index].item(item_id).is_none() {
            return Err(ValidationError::UnknownItem(item_id));
        }

        let mut candidate = self.contributors.clone();
        candidate[index].items.retain(|item| item.id != item_id);
        if candidate[index].items.is_empty() {
            candidate.remove(index);
        }
        // Only transitions into a violation are refused; a ledger already out of
        // bounds after an unconditional removal can still be cleaned up.
        if rules::check_fixed_bound(self.fixed_total(), self.total()).is_ok() {
            rules::check_fixed_bound(
                rules::fixed_total(&candidate),
                rules::grand_total(&candidate),
            )?;
        }
        if rules::check_share_present(&self.contributors).is_ok() {
            rules::check_share_present(&candidate)?;
        }

        self.contributors = candidate;
        self.clear_edit_for(contributor_id, Some(item_id));
        debug!(%contributor_id, %item_id, "deleted item");
        Ok(())
    }

    /// Renames a contributor and sets how their obligation is computed.
    pub fn edit_contributor(
        &mut self,
        id: Uuid,
        new_name: &str,
        allocation: Allocation,
    ) -> Result<(), ValidationError> {
        self.ensure_unlocked()?;
        let index = self.position(id)?;
        let name = new_name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        let normalized = normalize_label(name);
        if self
            .contributors
            .iter()
            .any(|other| other.id != id && other.normalized_name() == normalized)
        {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        allocation.validate()?;
        let allocation = match allocation {
            Allocation::Fixed { amount } => Allocation::fixed(round_cents(amount)),
            share => share,
        };

        let current_fixed = self.contributors[index]
            .allocation
            .fixed_amount()
            .unwrap_or(0.0);
        let next_fixed = allocation.fixed_amount().unwrap_or(0.0);
        if allocation.fixed_amount().is_some() {
            rules::check_fixed_bound(
                self.fixed_total() - current_fixed + next_fixed,
                self.total(),
            )?;
        }
        let share_remains = allocation.is_share()
            || self
                .contributors
                .iter()
                .any(|other| other.id != id && other.allocation.is_share());
        if !share_remains {
            return Err(ValidationError::NoShareContributor);
        }

        let contributor = &mut self.contributors[index];
        contributor.name = name.to_string();
        contributor.allocation = allocation;
        if self.edit_mode == EditMode::Contributor(id) {
            self.edit_mode = EditMode::Idle;
        }
        debug!(%id, name, %allocation, "edited contributor");
        Ok(())
    }

    /// Removes a contributor and all of their items.
    pub fn remove_contributor(&mut self, id: Uuid) -> Result<Contributor, ValidationError> {
        self.ensure_unlocked()?;
        let index = self.position(id)?;
        let removed = self.contributors.remove(index);
        self.clear_edit_for(id, None);
        debug!(%id, name = %removed.name, "removed contributor");
        Ok(removed)
    }

    /// Drops every contributor.
    pub fn clear(&mut self) -> Result<(), ValidationError> {
        self.ensure_unlocked()?;
        self.contributors.clear();
        self.edit_mode = EditMode::Idle;
        tracing::info!("cleared all contributors");
        Ok(())
    }

    /// Replaces the whole ledger after validating the incoming contributors.
    pub fn replace_all(&mut self, contributors: Vec<Contributor>) -> Result<(), ValidationError> {
        self.ensure_unlocked()?;
        rules::validate_contributors(&contributors)?;
        self.install(contributors);
        Ok(())
    }

    fn install(&mut self, contributors: Vec<Contributor>) {
        self.contributors = contributors
            .into_iter()
            .map(|mut contributor| {
                contributor.name = contributor.name.trim().to_string();
                for item in &mut contributor.items {
                    item.description = item.description.trim().to_string();
                    item.amount = round_cents(item.amount);
                }
                contributor
            })
            .collect();
        self.edit_mode = EditMode::Idle;
    }

    /// Enters single-item edit mode and returns the item's current values.
    pub fn start_item_edit(
        &mut self,
        contributor_id: Uuid,
        item_id: Uuid,
    ) -> Result<Item, ValidationError> {
        self.ensure_unlocked()?;
        let item = self
            .contributor(contributor_id)
            .ok_or(ValidationError::UnknownContributor(contributor_id))?
            .item(item_id)
            .cloned()
            .ok_or(ValidationError::UnknownItem(item_id))?;
        self.edit_mode = EditMode::Item {
            contributor: contributor_id,
            item: item_id,
        };
        Ok(item)
    }

    /// Enters single-contributor edit mode and returns the current values.
    pub fn start_contributor_edit(&mut self, id: Uuid) -> Result<Contributor, ValidationError> {
        self.ensure_unlocked()?;
        let contributor = self
            .contributor(id)
            .cloned()
            .ok_or(ValidationError::UnknownContributor(id))?;
        self.edit_mode = EditMode::Contributor(id);
        Ok(contributor)
    }

    /// Leaves single-entity edit mode. Batch sessions are unaffected.
    pub fn cancel_edit(&mut self) {
        if !matches!(self.edit_mode, EditMode::Batch(_)) {
            self.edit_mode = EditMode::Idle;
        }
    }

    /// Releases a batch lock whose session was dropped without commit or
    /// rollback. Returns whether a lock was held.
    pub fn abort_session(&mut self) -> bool {
        if let EditMode::Batch(token) = self.edit_mode {
            warn!(%token, "released abandoned batch edit lock");
            self.edit_mode = EditMode::Idle;
            true
        } else {
            false
        }
    }

    pub(crate) fn lock_for_session(&mut self, token: Uuid) -> Result<(), SessionError> {
        if matches!(self.edit_mode, EditMode::Batch(_)) {
            return Err(SessionError::AlreadyOpen);
        }
        if self.edit_mode != EditMode::Idle {
            debug!(mode = ?self.edit_mode, "cancelled single edit for batch session");
        }
        self.edit_mode = EditMode::Batch(token);
        Ok(())
    }

    pub(crate) fn ensure_session(&self, token: Uuid) -> Result<(), SessionError> {
        match self.edit_mode {
            EditMode::Batch(current) if current == token => Ok(()),
            _ => Err(SessionError::LockMismatch),
        }
    }

    /// Installs contributors produced by a session and releases its lock.
    pub(crate) fn finish_session(&mut self, token: Uuid, contributors: Vec<Contributor>) {
        if self.edit_mode == EditMode::Batch(token) {
            self.contributors = contributors;
            self.edit_mode = EditMode::Idle;
        }
    }

    fn ensure_unlocked(&self) -> Result<(), ValidationError> {
        if matches!(self.edit_mode, EditMode::Batch(_)) {
            Err(ValidationError::EditSessionOpen)
        } else {
            Ok(())
        }
    }

    fn position(&self, id: Uuid) -> Result<usize, ValidationError> {
        self.contributors
            .iter()
            .position(|c| c.id == id)
            .ok_or(ValidationError::UnknownContributor(id))
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        let normalized = normalize_label(name);
        self.contributors
            .iter()
            .position(|c| c.normalized_name() == normalized)
    }

    fn clear_edit_for(&mut self, contributor_id: Uuid, item_id: Option<Uuid>) {
        let stale = match self.edit_mode {
            EditMode::Contributor(id) => id == contributor_id && self.contributor(id).is_none(),
            EditMode::Item { contributor, item } => {
                contributor == contributor_id
                    && (item_id.map_or(true, |removed| removed == item)
                        || self.contributor(contributor).is_none())
            }
            _ => false,
        };
        if stale {
            self.edit_mode = EditMode::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str, f64)]) -> LedgerStore {
        let mut store = LedgerStore::new();
        for (name, description, amount) in entries {
            store
                .add_contribution(name, Some(description), Some(*amount), 1)
                .expect("seed contribution");
        }
        store
    }

    #[test]
    fn first_contribution_creates_share_contributor() {
        let mut store = LedgerStore::new();
        let reference = store
            .add_contribution("  Sam ", None, Some(12.0), 3)
            .unwrap();
        let sam = store.contributor(reference.contributor).unwrap();
        assert_eq!(sam.name, "Sam");
        assert_eq!(sam.allocation, Allocation::share(3));
        assert_eq!(sam.items[0].description, "miscellaneous");
    }

    #[test]
    fn new_contributor_weight_is_validated() {
        let mut store = LedgerStore::new();
        let err = store
            .add_contribution("Sam", None, Some(5.0), 0)
            .expect_err("weight 0 must be rejected");
        assert_eq!(err, ValidationError::ShareWeightOutOfRange(0));
        assert!(store.is_empty());
    }

    #[test]
    fn described_item_needs_an_amount() {
        let mut store = LedgerStore::new();
        let err = store
            .add_contribution("Sam", Some("Taxi"), None, 1)
            .expect_err("description without amount");
        assert_eq!(err, ValidationError::MissingAmount("Taxi".into()));
    }

    #[test]
    fn funded_contributor_rejects_placeholder() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0)]);
        let err = store
            .add_contribution("sam", None, None, 1)
            .expect_err("placeholder on funded contributor");
        assert_eq!(
            err,
            ValidationError::ZeroAmountForFundedContributor("Sam".into())
        );
        assert_eq!(store.contributors()[0].items.len(), 1);
    }

    #[test]
    fn edit_item_rejects_collisions_and_keeps_state() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0), ("Sam", "Taxi", 8.0)]);
        let sam = store.contributors()[0].clone();
        let taxi = sam.items[1].id;
        let err = store
            .edit_item(sam.id, taxi, "LUNCH", 9.0)
            .expect_err("collision");
        assert!(matches!(err, ValidationError::DuplicateDescription { .. }));
        assert_eq!(store.contributors()[0], sam);

        store.edit_item(sam.id, taxi, "Train", 9.5).unwrap();
        let item = store.contributors()[0].item(taxi).unwrap();
        assert_eq!(item.description, "Train");
        assert_eq!(item.amount, 9.5);
    }

    #[test]
    fn edit_item_keeps_fixed_bound() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0), ("Kim", "Drinks", 10.0)]);
        let kim = store.find_by_name("kim").unwrap().id;
        store
            .edit_contributor(kim, "Kim", Allocation::fixed(25.0))
            .unwrap();
        let sam = store.find_by_name("sam").unwrap().clone();
        let err = store
            .edit_item(sam.id, sam.items[0].id, "Lunch", 10.0)
            .expect_err("total would drop below the fixed amount");
        assert!(matches!(
            err,
            ValidationError::FixedAmountExceedsTotal { .. }
        ));
    }

    #[test]
    fn deleting_last_item_removes_contributor() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0), ("Kim", "Drinks", 10.0)]);
        let kim = store.find_by_name("Kim").unwrap().clone();
        store.delete_item(kim.id, kim.items[0].id).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find_by_name("Kim").is_none());
    }

    #[test]
    fn deleting_last_share_contributor_is_refused() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0), ("Kim", "Drinks", 10.0)]);
        let kim = store.find_by_name("Kim").unwrap().id;
        store
            .edit_contributor(kim, "Kim", Allocation::fixed(5.0))
            .unwrap();
        let sam = store.find_by_name("Sam").unwrap().clone();
        let err = store
            .delete_item(sam.id, sam.items[0].id)
            .expect_err("Kim alone would be fixed");
        assert_eq!(err, ValidationError::NoShareContributor);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn edit_contributor_validates_in_order() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0), ("Kim", "Drinks", 10.0)]);
        let sam = store.find_by_name("Sam").unwrap().id;
        assert_eq!(
            store.edit_contributor(sam, "  ", Allocation::share(1)),
            Err(ValidationError::BlankName)
        );
        assert_eq!(
            store.edit_contributor(sam, "KIM", Allocation::share(1)),
            Err(ValidationError::DuplicateName("KIM".into()))
        );
        assert_eq!(
            store.edit_contributor(sam, "Sam", Allocation::share(11)),
            Err(ValidationError::ShareWeightOutOfRange(11))
        );
        assert!(matches!(
            store.edit_contributor(sam, "Sam", Allocation::fixed(31.0)),
            Err(ValidationError::FixedAmountExceedsTotal { .. })
        ));
        store
            .edit_contributor(sam, "Samantha", Allocation::fixed(30.0))
            .unwrap();
        let kim = store.find_by_name("Kim").unwrap().id;
        assert_eq!(
            store.edit_contributor(kim, "Kim", Allocation::fixed(0.0)),
            Err(ValidationError::NoShareContributor)
        );
    }

    #[test]
    fn remove_contributor_is_unconditional() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0)]);
        let sam = store.find_by_name("Sam").unwrap().id;
        let removed = store.remove_contributor(sam).unwrap();
        assert_eq!(removed.name, "Sam");
        assert!(store.is_empty());
        assert_eq!(
            store.remove_contributor(sam),
            Err(ValidationError::UnknownContributor(sam))
        );
    }

    #[test]
    fn single_edit_mode_ends_after_successful_edit() {
        let mut store = store_with(&[("Sam", "Lunch", 20.0)]);
        let sam = store.contributors()[0].clone();
        let item = store.start_item_edit(sam.id, sam.items[0].id).unwrap();
        assert_eq!(item.description, "Lunch");
        assert!(matches!(store.edit_mode(), EditMode::Item { .. }));
        store.edit_item(sam.id, item.id, "Brunch", 22.0).unwrap();
        assert_eq!(store.edit_mode(), EditMode::Idle);

        store.start_contributor_edit(sam.id).unwrap();
        store.cancel_edit();
        assert_eq!(store.edit_mode(), EditMode::Idle);
    }

    #[test]
    fn snapshot_round_trips_through_validation() {
        let store = store_with(&[("Sam", "Lunch", 20.0), ("Kim", "Drinks", 10.0)]);
        let restored = LedgerStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(restored.contributors(), store.contributors());
    }
}
