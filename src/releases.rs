use std::collections::BTreeMap;

use anyhow::{Context as _, Result, ensure};
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::parsing::extract_csrf_token;
use crate::session::Session;
use crate::version::Version;

#[derive(Deserialize)]
struct ProjectMetadata {
    releases: BTreeMap<String, IgnoredAny>,
}

pub fn metadata_path(package: &str) -> String {
    format!("/pypi/{}/json", package)
}

pub fn release_path(package: &str, version: &str) -> String {
    format!("/manage/project/{}/release/{}/", package, version)
}

/// Every release of `package` on the index, oldest first.
pub fn get_releases(session: &Session, package: &str) -> Result<Vec<Version>> {
    let url = session.url(&metadata_path(package))?;
    let page = session.get_page(&url)?;
    ensure!(
        page.status.is_success(),
        "failed to fetch release list for `{}`: HTTP {}",
        package,
        page.status
    );

    let metadata: ProjectMetadata = serde_json::from_str(&page.body)
        .with_context(|| format!("failed to parse release list for `{}`", package))?;

    let mut releases = metadata
        .releases
        .keys()
        .map(|key| key.parse::<Version>())
        .collect::<Result<Vec<_>>>()?;
    releases.sort();

    tracing::info!("Found {} release(s) of {}", releases.len(), package);
    Ok(releases)
}

/// Delete one release through the project management page.
///
/// The confirmation page is fetched for its CSRF token and the confirmation
/// form is submitted with that page as referer.
pub fn delete_release(session: &Session, package: &str, version: &str) -> Result<()> {
    let url = session.url(&release_path(package, version))?;
    let page = session.get_page(&url)?;
    let token = extract_csrf_token(&page.body)
        .with_context(|| format!("failed to read delete form for {} {}", package, version))?;

    tracing::info!("Deleting {} {}", package, version);
    let response = session.post_form(
        &url,
        &[
            ("confirm_delete_version", version),
            ("csrf_token", token.as_str()),
        ],
        &url,
    )?;
    ensure!(
        !response.status.is_client_error() && !response.status.is_server_error(),
        "failed to delete {} {}: HTTP {}",
        package,
        version,
        response.status
    );
    Ok(())
}
