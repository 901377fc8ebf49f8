use std::env::{self, VarError};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result, bail};

pub const USERNAME_VAR: &str = "PYPI_USERNAME";
pub const PASSWORD_VAR: &str = "PYPI_PASSWORD";

/// Account used to log in to the package index.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load `env_file` into the environment when it exists, then read the
    /// account from `PYPI_USERNAME` and `PYPI_PASSWORD`.
    pub fn load(env_file: &Path) -> Result<Self> {
        if env_file.exists() {
            load_dotenv_file(env_file)?;
        } else {
            tracing::debug!("No env file at {}, using the environment", env_file.display());
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Credentials {
            username: required_var(USERNAME_VAR)?,
            password: required_var(PASSWORD_VAR)?,
        })
    }
}

fn required_var(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => bail!("environment variable `{}` is not set", key),
        Err(VarError::NotUnicode(_)) => {
            bail!("environment variable `{}` is not valid unicode", key)
        }
    }
}

/// Split `.env` style contents into key/value pairs.
///
/// Lines are trimmed; blank lines, `#` comments and lines without `=` are
/// skipped. Only the first `=` separates key from value. Values are taken
/// verbatim: quotes are kept and `$VAR` is not expanded.
pub fn parse_dotenv(contents: &str) -> Vec<(&str, &str)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .collect()
}

/// Set every pair from a `.env` style file in the process environment,
/// overwriting values that are already present.
pub fn load_dotenv_file(path: &Path) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read: {}", path.display()))?;

    for (key, value) in parse_dotenv(&contents) {
        if key.is_empty() || key.contains('\0') || value.contains('\0') {
            tracing::warn!("Skipping unusable line for key {:?} in {}", key, path.display());
            continue;
        }
        tracing::debug!("Setting {} from {}", key, path.display());
        // SAFETY: the tool is single threaded; nothing reads the environment
        // concurrently while the file is applied.
        unsafe { env::set_var(key, value) };
    }
    Ok(())
}
