//! Opaque cursor and page envelope primitives shared by list endpoints.
//!
//! Cursors are base64url-encoded JSON objects so clients treat them as opaque
//! tokens. Adapters fetch one item more than the requested limit and hand the
//! result to [`Page::from_overfetch`], which decides whether a follow-up cursor
//! should be issued.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Page size used when the client does not supply one.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: usize = 100;

/// Errors raised while interpreting pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The requested limit is outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max} (got {limit})")]
    InvalidLimit { limit: usize, max: usize },
    /// The cursor could not be decoded.
    #[error("cursor is malformed")]
    MalformedCursor,
}

/// Decoded cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(rename = "o")]
    offset: usize,
}

impl Cursor {
    /// Cursor pointing at the given zero-based offset.
    pub const fn at(offset: usize) -> Self {
        Self { offset }
    }

    /// Zero-based offset of the first item on the page.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Encode the cursor as an opaque token.
    pub fn encode(&self) -> String {
        // Serialising a single integer field cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode an opaque token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::MalformedCursor`] when the token is not valid
    /// base64url or does not contain a cursor object.
    pub fn decode(token: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| PaginationError::MalformedCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| PaginationError::MalformedCursor)
    }
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    cursor: Cursor,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cursor: Cursor::at(0),
        }
    }
}

impl PageRequest {
    /// Validate raw query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidLimit`] for limits outside
    /// `1..=MAX_LIMIT` and [`PaginationError::MalformedCursor`] for cursors
    /// that fail to decode.
    pub fn new(limit: Option<usize>, cursor: Option<&str>) -> Result<Self, PaginationError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::InvalidLimit {
                limit,
                max: MAX_LIMIT,
            });
        }
        let cursor = match cursor {
            Some(token) if !token.trim().is_empty() => Cursor::decode(token)?,
            _ => Cursor::at(0),
        };
        Ok(Self { limit, cursor })
    }

    /// Maximum number of items to return.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Offset of the first item to return.
    pub const fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Number of items adapters should fetch to detect a following page.
    pub const fn fetch_limit(&self) -> usize {
        self.limit + 1
    }
}

/// A page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Opaque cursor for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from a result set fetched with [`PageRequest::fetch_limit`].
    pub fn from_overfetch(mut items: Vec<T>, request: &PageRequest) -> Self {
        let has_more = items.len() > request.limit();
        items.truncate(request.limit());
        let next_cursor =
            has_more.then(|| Cursor::at(request.offset() + request.limit()).encode());
        Self {
            data: items,
            next_cursor,
        }
    }

    /// Transform every item while keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
