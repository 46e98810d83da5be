//! Unique-ID source port.

/// Error type for ID generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Sequence exhausted for the current millisecond")]
    Exhausted,

    #[error("Clock moved backwards by {0} ms")]
    ClockMovedBackwards(u64),

    #[error("Node id {0} does not fit in 10 bits")]
    InvalidNodeId(u16),
}

/// Port trait for distributed unique-ID generators.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<u64, IdError>;
}
