//! Pagination tokens.
//!
//! The relational store pages by offset and the token carries the next skip
//! plus the id of the last record seen. The columnar store hands out opaque
//! paging bytes that travel hex encoded. Both treat `""` as "start" on input
//! and as "no more pages" on output.

use crate::error::{StoreError, StoreResult};

/// Encoding and decoding of page tokens for one backend.
pub trait CursorCodec: Send + Sync {
    type State: Send;

    fn decode(&self, token: &str) -> StoreResult<Self::State>;

    /// Token for the page after the one that was just read.
    fn encode(&self, state: &Self::State, page_len: usize, page_size: usize) -> String;
}

/// Decoded offset token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetState {
    pub skip: u64,
    pub last_id: Option<String>,
}

/// `"{skip}|{last_id}"` tokens for offset-paged stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetCursor;

impl CursorCodec for OffsetCursor {
    type State = OffsetState;

    fn decode(&self, token: &str) -> StoreResult<OffsetState> {
        if token.is_empty() {
            return Ok(OffsetState::default());
        }
        let (skip, last_id) = match token.split_once('|') {
            Some((skip, last_id)) => (skip, Some(last_id.to_string())),
            None => (token, None),
        };
        // digits only, and small enough for a SQL bigint offset
        if skip.is_empty() || !skip.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::InvalidCursor(token.to_string()));
        }
        let skip = skip
            .parse::<i64>()
            .map_err(|_| StoreError::InvalidCursor(token.to_string()))?;
        Ok(OffsetState {
            skip: skip as u64,
            last_id,
        })
    }

    fn encode(&self, state: &OffsetState, page_len: usize, page_size: usize) -> String {
        if page_len == 0 || page_size == 0 || page_len < page_size {
            return String::new();
        }
        format!(
            "{}|{}",
            state.skip + page_size as u64,
            state.last_id.as_deref().unwrap_or_default()
        )
    }
}

/// Hex tokens over the backend's own paging state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCursor;

impl CursorCodec for NativeCursor {
    type State = Vec<u8>;

    fn decode(&self, token: &str) -> StoreResult<Vec<u8>> {
        hex::decode(token).map_err(|_| StoreError::InvalidCursor(token.to_string()))
    }

    fn encode(&self, state: &Vec<u8>, _page_len: usize, _page_size: usize) -> String {
        hex::encode(state)
    }
}
