pub mod auth;
pub mod credentials;
pub mod parsing;
pub mod releases;
pub mod session;
pub mod types;
pub mod version;

use anyhow::Result;

pub use auth::{CodeProvider, ConsolePrompt, LoginOutcome, login};
pub use credentials::Credentials;
pub use releases::{delete_release, get_releases};
pub use session::Session;
pub use types::PruneControl;
pub use version::Version;

/// Delete the `control.number` oldest releases of `control.package`.
///
/// Releases are listed first, then the session is logged in with the
/// credentials from `control.env_file` or the environment. Deletions run one
/// at a time in ascending version order; in dry-run mode they are only
/// reported. Returns the versions acted on.
pub fn delete_n_oldest_releases(
    session: &Session,
    control: &PruneControl,
    codes: &mut dyn CodeProvider,
) -> Result<Vec<Version>> {
    let releases = get_releases(session, &control.package)?;

    let credentials = Credentials::load(&control.env_file)?;
    let outcome = login(session, &credentials, codes)?;
    tracing::debug!("Login finished: {:?}", outcome);

    let oldest: Vec<Version> = releases.into_iter().take(control.number).collect();
    for version in &oldest {
        if control.dry_run {
            println!("{} would be removed, if this wasn't a dry-run", version);
        } else {
            delete_release(session, &control.package, &version.to_string())?;
            println!("{} was deleted", version);
        }
    }

    Ok(oldest)
}
