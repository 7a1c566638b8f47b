//! Keyed read over the level listing.
//!
//! The control plane has no "get level for target" call, so a lookup walks
//! the paginated listing until it finds the target or runs out of pages.

use std::collections::HashSet;

use tracing::debug;

use crate::clients::LoggingClient;
use crate::config::LookupConfig;
use crate::error::{HandlerError, RemoteResultExt, Result};

/// Find the log level configured for `(target_type, target_name)`.
///
/// Returns on the first exact match without requesting further pages. Stops
/// with `Ok(None)` when the listing returns no continuation token. A token
/// seen twice, or more than `config.max_pages` pages, aborts the scan.
pub async fn find_log_level(
    client: &dyn LoggingClient,
    config: &LookupConfig,
    target_type: &str,
    target_name: &str,
) -> Result<Option<String>> {
    let mut token: Option<String> = None;
    let mut seen = HashSet::new();

    for page_number in 1..=config.max_pages {
        let page = client
            .list_logging_levels(token.as_deref(), config.page_size)
            .await
            .during("ListLoggingLevels")?;

        if let Some(entry) = page
            .entries
            .into_iter()
            .find(|e| e.target_type == target_type && e.target_name == target_name)
        {
            debug!(
                "Found level {} for {}:{} on page {}",
                entry.log_level, target_type, target_name, page_number
            );
            return Ok(Some(entry.log_level));
        }

        match page.next_token.filter(|t| !t.is_empty()) {
            None => {
                debug!(
                    "No level for {}:{} after {} pages",
                    target_type, target_name, page_number
                );
                return Ok(None);
            }
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(HandlerError::PaginationRunaway(format!(
                        "token '{next}' repeated on page {page_number}"
                    )));
                }
                token = Some(next);
            }
        }
    }

    Err(HandlerError::PaginationRunaway(format!(
        "more than {} pages",
        config.max_pages
    )))
}
