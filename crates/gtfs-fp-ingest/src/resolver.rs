//! Feed version discovery
//!
//! The landing URL never serves the archive itself: it answers with a redirect
//! whose target file name encodes the current feed version. Exactly one
//! request is made and the redirect is never followed.

use gtfs_fp_common::types::FeedVersion;
use reqwest::{header::LOCATION, redirect::Policy, StatusCode, Url};
use tracing::{debug, instrument};

use crate::error::ResolveError;

/// Canonical download location of the current feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFeed {
    pub url: Url,
    pub file_name: String,
    pub version: FeedVersion,
}

pub struct VersionResolver {
    client: reqwest::Client,
}

impl VersionResolver {
    pub fn new() -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(ResolveError::Client)?;
        Ok(Self { client })
    }

    #[instrument(skip(self), fields(landing_url = %landing_url))]
    pub async fn resolve(&self, landing_url: &Url) -> Result<ResolvedFeed, ResolveError> {
        let response = self
            .client
            .get(landing_url.clone())
            .send()
            .await
            .map_err(|source| ResolveError::Request {
                url: landing_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !is_redirect(status) {
            return Err(ResolveError::UnexpectedStatus(status.as_u16()));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(ResolveError::MissingLocation(status.as_u16()))?;

        debug!(%status, location, "Landing URL redirected");

        // Relative locations are legal and resolve against the request URL
        let url = landing_url
            .join(location)
            .map_err(|err| ResolveError::InvalidLocation {
                location: location.to_string(),
                reason: err.to_string(),
            })?;

        resolved_feed(url)
    }
}

/// Redirect codes that carry the canonical download URL
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Parse the feed version out of a resolved download URL
pub fn resolved_feed(url: Url) -> Result<ResolvedFeed, ResolveError> {
    let file_name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default()
        .to_string();
    let version = FeedVersion::from_file_name(&file_name)?;

    Ok(ResolvedFeed {
        url,
        file_name,
        version,
    })
}
