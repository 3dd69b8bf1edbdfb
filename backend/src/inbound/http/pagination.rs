//! Query parameters shared by paginated list endpoints.

use pagination::{PageRequest, PaginationError};
use serde::Deserialize;
use tracing::debug;

use crate::domain::Error;

/// `?limit=&cursor=` as sent by clients.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl PageParams {
    /// Validate into a [`PageRequest`], mapping failures to field errors.
    pub fn page_request(&self) -> Result<PageRequest, Error> {
        PageRequest::new(self.limit, self.cursor.as_deref()).map_err(|err| {
            debug!(error = %err, "pagination parameters rejected");
            match err {
                PaginationError::InvalidLimit { .. } => {
                    Error::invalid_field("limit", "invalid_limit", err.to_string())
                }
                PaginationError::MalformedCursor => {
                    Error::invalid_field("cursor", "invalid_cursor", err.to_string())
                }
            }
        })
    }
}
