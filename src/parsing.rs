use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

static CSRF_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input\s+name="csrf_token"\s+type="hidden"\s+value="(.+?)">"#)
        .expect("csrf pattern is valid")
});

/// Pull the hidden `csrf_token` form value out of an HTML page.
///
/// The warehouse templates render the field as
/// `<input name="csrf_token" type="hidden" value="...">`; this matches that
/// literal layout and nothing else, so a markup change on the index side
/// surfaces here as an error rather than as an empty token being submitted.
pub fn extract_csrf_token(page: &str) -> Result<String> {
    match CSRF_TOKEN_RE.captures(page) {
        Some(caps) => Ok(caps[1].to_string()),
        None => bail!("Couldn't find CSRF token"),
    }
}
