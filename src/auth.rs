use std::io::{self, BufRead as _, Write as _};

use anyhow::{Context as _, Result, bail, ensure};

use crate::credentials::Credentials;
use crate::parsing::extract_csrf_token;
use crate::session::Session;

pub const LOGIN_PATH: &str = "/account/login/";
pub const TWO_FACTOR_PATH: &str = "/account/two-factor/";

/// Source of one-time passcodes for the second login factor.
pub trait CodeProvider {
    fn two_factor_code(&mut self) -> Result<String>;
}

impl<F> CodeProvider for F
where
    F: FnMut() -> Result<String>,
{
    fn two_factor_code(&mut self) -> Result<String> {
        self()
    }
}

/// Asks on the terminal. Blocks until a line is entered.
pub struct ConsolePrompt;

impl CodeProvider for ConsolePrompt {
    fn two_factor_code(&mut self) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "Two-factor code: ")?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read two-factor code")?;
        if read == 0 {
            bail!("no two-factor code entered");
        }
        Ok(line.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    LoggedInWithSecondFactor,
}

/// Log `session` in to the index.
///
/// The login form is fetched for its CSRF token and submitted. If the index
/// answers by landing on the two-factor page, a TOTP code from `codes` is
/// submitted with that page's token. Any unexpected status ends the run.
pub fn login(
    session: &Session,
    credentials: &Credentials,
    codes: &mut dyn CodeProvider,
) -> Result<LoginOutcome> {
    let login_url = session.url(LOGIN_PATH)?;
    let login_page = session.get_page(&login_url)?;
    let token = extract_csrf_token(&login_page.body).context("failed to read login form")?;

    tracing::info!("Logging in to {} as {}", session.index_url(), credentials.username);
    let response = session.post_form(
        &login_url,
        &[
            ("csrf_token", token.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ],
        &login_url,
    )?;

    let mut outcome = LoginOutcome::LoggedIn;
    if response.url.path() == TWO_FACTOR_PATH {
        tracing::info!("Second factor requested");
        let token =
            extract_csrf_token(&response.body).context("failed to read two-factor form")?;
        let code = codes.two_factor_code()?;
        let challenge = session.post_form(
            &response.url,
            &[
                ("csrf_token", token.as_str()),
                ("method", "totp"),
                ("totp_value", code.as_str()),
            ],
            &response.url,
        )?;
        ensure!(
            challenge.status.is_success(),
            "after logging in we received status code: {}",
            challenge.status
        );
        outcome = LoginOutcome::LoggedInWithSecondFactor;
    }

    ensure!(
        response.status.is_success(),
        "after logging in we received status code: {}",
        response.status
    );
    tracing::info!("Logged in as {}", credentials.username);
    Ok(outcome)
}
