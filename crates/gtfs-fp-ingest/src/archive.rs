//! Archive acquisition and allow-list extraction
//!
//! The archive is buffered whole in memory: it is published byte-for-byte
//! before anything parses it, then opened as a zip index from which only the
//! allow-listed members are decompressed into the scratch workspace.

use reqwest::Url;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::ArchiveError;

/// Members materialized from the feed archive; everything else is ignored
pub const ALLOWED_MEMBERS: [&str; 4] = ["stops.txt", "routes.txt", "stop_times.txt", "trips.txt"];

/// One allow-listed member written to the scratch workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMember {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Download the full archive body
#[instrument(skip(client), fields(url = %url))]
pub async fn download(client: &reqwest::Client, url: &Url) -> Result<Vec<u8>, ArchiveError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| ArchiveError::Download {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ArchiveError::DownloadStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| ArchiveError::Download {
            url: url.to_string(),
            source,
        })?;

    info!(bytes = body.len(), "Downloaded timetable archive");
    Ok(body.to_vec())
}

/// Extract the `allow_list` members of a zip archive into `dest`.
///
/// Members are matched by their exact entry name. Entries outside the list
/// are never decompressed. Every listed member must be present.
pub fn extract_members(
    data: &[u8],
    dest: &Path,
    allow_list: &[&str],
) -> Result<Vec<ExtractedMember>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(ArchiveError::Malformed)?;

    let present: HashSet<&str> = archive.file_names().collect();
    let missing: Vec<String> = allow_list
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ArchiveError::MissingMembers(missing));
    }

    debug!(
        entries = archive.len(),
        selected = allow_list.len(),
        "Opened timetable archive"
    );

    let mut extracted = Vec::with_capacity(allow_list.len());

    for &name in allow_list {
        let mut entry = archive
            .by_name(name)
            .map_err(|source| ArchiveError::Entry {
                name: name.to_string(),
                source,
            })?;

        // Declared sizes come from the archive and are not trusted
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|source| ArchiveError::Read {
                name: name.to_string(),
                source,
            })?;

        let path = dest.join(name);
        std::fs::write(&path, &contents).map_err(|source| ArchiveError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(member = name, bytes = contents.len(), "Extracted archive member");
        extracted.push(ExtractedMember {
            name: name.to_string(),
            path,
            size: contents.len() as u64,
        });
    }

    Ok(extracted)
}
