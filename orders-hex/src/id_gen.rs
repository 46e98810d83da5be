//! Snowflake-style unique IDs.
//!
//! Layout (63 bits):
//!   - 41 bits: milliseconds since 2024-01-01 UTC
//!   - 10 bits: node id
//!   - 12 bits: per-millisecond sequence

use std::sync::Mutex;

use orders_types::{IdError, IdGenerator};

/// Custom epoch: 2024-01-01 00:00:00 UTC.
pub const EPOCH_MS: i64 = 1_704_067_200_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = 0x1FF_FFFF_FFFF;

#[derive(Default)]
struct State {
    last_ms: i64,
    sequence: u64,
}

/// Generates unique, time-ordered IDs for one node.
///
/// Fails instead of waiting when the sequence runs out within a millisecond
/// or when the wall clock steps backwards.
pub struct SnowflakeGenerator {
    node_id: u64,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u16) -> Result<Self, IdError> {
        if node_id > MAX_NODE_ID {
            return Err(IdError::InvalidNodeId(node_id));
        }
        Ok(Self {
            node_id: u64::from(node_id),
            state: Mutex::new(State::default()),
        })
    }

    fn next_id_at(&self, now_ms: i64) -> Result<u64, IdError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        if now_ms < state.last_ms {
            return Err(IdError::ClockMovedBackwards((state.last_ms - now_ms) as u64));
        }

        if now_ms == state.last_ms {
            if state.sequence >= MAX_SEQUENCE {
                return Err(IdError::Exhausted);
            }
            state.sequence += 1;
        } else {
            state.last_ms = now_ms;
            state.sequence = 0;
        }

        let ts = (now_ms.saturating_sub(EPOCH_MS).max(0) as u64) & TIMESTAMP_MASK;
        Ok((ts << (NODE_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | state.sequence)
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn next_id(&self) -> Result<u64, IdError> {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }
}
