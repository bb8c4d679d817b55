//! External Integrations
//!
//! HTTP clients for the systems Nirvana talks to.
//!
//! # Sources
//!
//! - **GitHub**: GraphQL issue search
//! - **TargetProcess**: REST v2 user story query with nested tasks and bugs
//!
//! # Mirror target
//!
//! - **Todoist**: Sync API snapshot and command batches

pub mod github;
pub mod targetprocess;
pub mod todoist;

pub use github::{GitHubAdapter, SearchResult};
pub use targetprocess::{EntityKind, ProjectRef, SubItem, TargetProcessAdapter, UserStory};
pub use todoist::{TodoistClient, MAX_COMMANDS_PER_REQUEST};

use crate::{NirvanaError, Result};
use reqwest::{Response, StatusCode};

/// Default wait when a 429 carries no usable Retry-After header
const DEFAULT_RETRY_AFTER: u64 = 60;

/// Convert a transport or decode failure into an error without the request URL
///
/// TargetProcess authenticates through a query parameter, so the URL carries
/// the access token.
pub(crate) fn request_error(err: reqwest::Error) -> NirvanaError {
    let err = err.without_url();
    let message = match std::error::Error::source(&err) {
        Some(source) => format!("{}: {}", err, source),
        None => err.to_string(),
    };

    if err.is_decode() {
        NirvanaError::Parse(message)
    } else if err.is_connect() || err.is_timeout() {
        NirvanaError::Network(message)
    } else {
        NirvanaError::Http(err)
    }
}

/// Map a non-success HTTP status to the matching error
pub(crate) async fn check_status(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NirvanaError::Auth(format!(
            "{} rejected the credentials: HTTP {}",
            service, status
        ))),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER);
            Err(NirvanaError::RateLimited(retry_after))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(NirvanaError::Integration(format!(
                "{} API error: HTTP {}: {}",
                service, status, body
            )))
        }
    }
}
