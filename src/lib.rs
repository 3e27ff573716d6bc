#![doc(test(attr(deny(warnings))))]

//! Splitsies core: a shared-expense ledger that records who paid for what,
//! splits costs by share weight or fixed amount, and computes the transfers
//! that settle everyone up.

pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod exchange;
pub mod ledger;
pub mod session;
pub mod settlement;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use errors::{SessionError, StorageError, ValidationError};
pub use ledger::{Allocation, Contributor, Item, LedgerStore};
pub use session::EditSession;
pub use settlement::{SettlementEngine, Transfer};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with_filter(None);
}

/// Initializes global tracing; `RUST_LOG` still wins over `filter`.
pub fn init_with_filter(filter: Option<&str>) {
    INIT_TRACING.call_once(|| {
        if utils::init_tracing(filter) {
            tracing::debug!("splitsies tracing initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_runs_once() {
        super::init();
        super::init_with_filter(Some("debug"));
        assert!(!super::utils::init_tracing(None));
    }
}
