use thiserror::Error;
use uuid::Uuid;

/// Rejection raised by any ledger mutation. The store is always left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name cannot be blank")]
    BlankName,
    #[error("A person named `{0}` already exists")]
    DuplicateName(String),
    #[error("`{contributor}` already has an item described as `{description}`")]
    DuplicateDescription {
        contributor: String,
        description: String,
    },
    #[error("`{0}` has no items")]
    NoItems(String),
    #[error("An item of `{0}` has a blank description")]
    BlankDescription(String),
    #[error("Please enter an amount for the item `{0}`")]
    MissingAmount(String),
    #[error("Cannot add $0 items to `{0}`, who already has contributions")]
    ZeroAmountForFundedContributor(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Share weight must be between 1 and 10 (got {0})")]
    ShareWeightOutOfRange(u8),
    #[error("Fixed amounts ({fixed:.2}) exceed the total contributed ({total:.2})")]
    FixedAmountExceedsTotal { fixed: f64, total: f64 },
    #[error("At least one person must pay by share")]
    NoShareContributor,
    #[error("Malformed import: {0}")]
    MalformedImport(String),
    #[error("Malformed import record {}: {reason}", describe_record(*contributor, *item))]
    MalformedRecord {
        contributor: usize,
        item: Option<usize>,
        reason: String,
    },
    #[error("Unknown contributor: {0}")]
    UnknownContributor(Uuid),
    #[error("Unknown item: {0}")]
    UnknownItem(Uuid),
    #[error("A batch edit is open; commit or roll it back first")]
    EditSessionOpen,
}

fn describe_record(contributor: usize, item: Option<usize>) -> String {
    match item {
        Some(item) => format!("#{contributor} item #{item}"),
        None => format!("#{contributor}"),
    }
}

/// Misuse of the batch edit state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("A batch edit is already open")]
    AlreadyOpen,
    #[error("No batch edit is open")]
    NotOpen,
    #[error("The batch edit was already committed")]
    AlreadyCommitted,
    #[error("The batch edit does not own this ledger")]
    LockMismatch,
    #[error("Nothing to stage for {0}")]
    UnknownEntity(String),
    #[error("Patch does not apply to {0}")]
    PatchMismatch(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Persistence failures. Callers log these; in-memory state stays authoritative.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unsupported snapshot schema version {0}")]
    SchemaVersion(u8),
    #[error("Stored snapshot is invalid: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Fatal shell failures. Command-level problems are reported and the shell keeps going.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}
