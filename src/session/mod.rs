//! Transactional batch editing: stage many field changes, validate once, then
//! commit atomically or roll back.
//!
//! An open session locks its [`LedgerStore`] against direct mutation. Callers
//! should finish every session with [`EditSession::commit`] or
//! [`EditSession::rollback`]. A session dropped while open keeps the store
//! locked until [`LedgerStore::abort_session`] releases it; staged changes
//! never reach the store, so aborting loses nothing that was committed.

pub mod draft;

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};
use uuid::Uuid;

pub use draft::{
    AllocationMode, ContributorDraft, ContributorPatch, EntityKey, ItemDraft, ItemPatch, Patch,
};

use crate::currency::{normalize_amount, round_cents};
use crate::errors::{SessionError, ValidationError};
use crate::ledger::item::resolve_description;
use crate::ledger::{
    normalize_label, rules, Allocation, Contributor, ItemRef, LedgerStore,
    PLACEHOLDER_DESCRIPTION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    Closed,
}

#[derive(Debug)]
pub struct EditSession {
    token: Uuid,
    state: SessionState,
    original: Vec<Contributor>,
    contributors: HashMap<Uuid, ContributorDraft>,
    items: HashMap<ItemRef, ItemDraft>,
    staged: HashSet<EntityKey>,
}

impl EditSession {
    /// Opens a session, cancelling any single-entity edit in progress.
    pub fn begin(store: &mut LedgerStore) -> Result<Self, SessionError> {
        let token = Uuid::new_v4();
        store.lock_for_session(token)?;
        let original = store.contributors().to_vec();
        let mut contributors = HashMap::new();
        let mut items = HashMap::new();
        for contributor in &original {
            contributors.insert(contributor.id, ContributorDraft::from_contributor(contributor));
            for item in &contributor.items {
                items.insert(
                    ItemRef {
                        contributor: contributor.id,
                        item: item.id,
                    },
                    ItemDraft::from_item(item),
                );
            }
        }
        info!(contributors = original.len(), "opened batch edit");
        Ok(Self {
            token,
            state: SessionState::Open,
            original,
            contributors,
            items,
            staged: HashSet::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Number of distinct entities with staged changes.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn contributor_draft(&self, id: Uuid) -> Option<&ContributorDraft> {
        self.contributors.get(&id)
    }

    pub fn item_draft(&self, contributor: Uuid, item: Uuid) -> Option<&ItemDraft> {
        self.items.get(&ItemRef { contributor, item })
    }

    /// Merges a partial update into an entity's draft without validating it.
    pub fn stage(&mut self, key: EntityKey, patch: impl Into<Patch>) -> Result<(), SessionError> {
        self.ensure_open()?;
        match (key, patch.into()) {
            (EntityKey::Contributor(id), Patch::Contributor(patch)) => self
                .contributors
                .get_mut(&id)
                .ok_or_else(|| SessionError::UnknownEntity(key.to_string()))?
                .apply(patch),
            (EntityKey::Item(reference), Patch::Item(patch)) => self
                .items
                .get_mut(&reference)
                .ok_or_else(|| SessionError::UnknownEntity(key.to_string()))?
                .apply(patch),
            _ => return Err(SessionError::PatchMismatch(key.to_string())),
        }
        self.staged.insert(key);
        debug!(%key, "staged change");
        Ok(())
    }

    /// The ledger as it would look after a commit, without any validation.
    pub fn preview(&self) -> Vec<Contributor> {
        self.original
            .iter()
            .map(|contributor| {
                let mut resolved = contributor.clone();
                if let Some(draft) = self.contributors.get(&contributor.id) {
                    resolved.name = draft.name.trim().to_string();
                    resolved.allocation = match draft.allocation() {
                        Allocation::Fixed { amount } => Allocation::fixed(round_cents(amount)),
                        share => share,
                    };
                }
                for item in &mut resolved.items {
                    let reference = ItemRef {
                        contributor: contributor.id,
                        item: item.id,
                    };
                    if let Some(draft) = self.items.get(&reference) {
                        let amount = round_cents(draft.amount);
                        item.description = resolve_description(&draft.description, amount);
                        item.amount = amount;
                    }
                }
                resolved
            })
            .collect()
    }

    /// Validates the staged view and applies it to the store in one step.
    ///
    /// On failure the store is untouched and the session stays open.
    pub fn commit(&mut self, store: &mut LedgerStore) -> Result<(), SessionError> {
        self.ensure_open()?;
        store.ensure_session(self.token)?;
        let resolved = self.preview();
        if let Err(err) = self.validate(&resolved) {
            debug!(error = %err, "batch edit rejected");
            return Err(err.into());
        }
        store.finish_session(self.token, resolved);
        info!(changes = self.staged.len(), "committed batch edit");
        self.clear_staging();
        self.state = SessionState::Committed;
        Ok(())
    }

    /// Discards staged changes and restores the ledger as it was at `begin`.
    pub fn rollback(&mut self, store: &mut LedgerStore) -> Result<(), SessionError> {
        self.ensure_open()?;
        store.ensure_session(self.token)?;
        store.finish_session(self.token, self.original.clone());
        info!(discarded = self.staged.len(), "rolled back batch edit");
        self.clear_staging();
        self.state = SessionState::Closed;
        Ok(())
    }

    fn validate(&self, resolved: &[Contributor]) -> Result<(), ValidationError> {
        if resolved.iter().any(|c| c.name.is_empty()) {
            return Err(ValidationError::BlankName);
        }

        let mut names = HashSet::new();
        for contributor in resolved {
            if !names.insert(contributor.normalized_name()) {
                return Err(ValidationError::DuplicateName(contributor.name.clone()));
            }
        }

        for contributor in resolved {
            let mut descriptions = HashSet::new();
            for item in &contributor.items {
                if !descriptions.insert(item.normalized_description()) {
                    return Err(ValidationError::DuplicateDescription {
                        contributor: contributor.name.clone(),
                        description: item.description.clone(),
                    });
                }
            }
        }

        rules::check_fixed_bound(rules::fixed_total(resolved), rules::grand_total(resolved))?;
        rules::check_share_present(resolved)?;

        for contributor in resolved {
            if let Allocation::Share { .. } = contributor.allocation {
                contributor.allocation.validate()?;
            }
        }

        for draft in self.contributors.values() {
            if draft.mode == AllocationMode::Fixed {
                normalize_amount(draft.fixed_amount)?;
            }
        }
        for draft in self.items.values() {
            normalize_amount(draft.amount)?;
        }

        for key in &self.staged {
            let EntityKey::Item(reference) = key else {
                continue;
            };
            if let Some(draft) = self.items.get(reference) {
                let description = draft.description.trim();
                let is_placeholder = normalize_label(description) == PLACEHOLDER_DESCRIPTION;
                if !description.is_empty() && !is_placeholder && round_cents(draft.amount) == 0.0 {
                    return Err(ValidationError::MissingAmount(description.to_string()));
                }
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Committed => Err(SessionError::AlreadyCommitted),
            SessionState::Closed => Err(SessionError::NotOpen),
        }
    }

    fn clear_staging(&mut self) {
        self.contributors.clear();
        self.items.clear();
        self.staged.clear();
    }
}
