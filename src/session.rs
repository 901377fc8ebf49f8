use anyhow::{Context as _, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use url::Url;

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// A fetched page: where the request ended up after redirects, and what it
/// returned.
#[derive(Debug)]
pub struct Page {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

impl Page {
    fn read(response: Response) -> Result<Self> {
        let url = response.url().clone();
        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok(Page { url, status, body })
    }
}

/// Cookie-carrying client bound to one package index.
///
/// Every step of a run goes through the same `Session`, so the login cookie
/// obtained by the authenticator is what authorises later deletions.
pub struct Session {
    client: Client,
    index_url: Url,
}

impl Session {
    pub fn new(index_url: Url) -> Result<Self> {
        Self::with_builder(index_url, Client::builder())
    }

    /// Build the session from a caller-provided client builder. The fixed
    /// `Accepts` header and the cookie store are always applied on top.
    pub fn with_builder(index_url: Url, builder: ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("accepts"),
            HeaderValue::from_static("application/json"),
        );

        let client = builder
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Session { client, index_url })
    }

    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// Resolve an absolute path such as `/account/login/` against the index.
    pub fn url(&self, path: &str) -> Result<Url> {
        resolve(&self.index_url, path)
    }

    pub fn get_page(&self, url: &Url) -> Result<Page> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to fetch {}", url))?;
        tracing::debug!("{} -> {} ({})", url, response.url(), response.status());
        Page::read(response)
    }

    /// Submit a urlencoded form with `referer` set, following redirects.
    pub fn post_form(&self, url: &Url, fields: &[(&str, &str)], referer: &Url) -> Result<Page> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .header(REFERER, referer.as_str())
            .form(fields)
            .send()
            .with_context(|| format!("failed to post to {}", url))?;
        tracing::debug!("{} -> {} ({})", url, response.url(), response.status());
        Page::read(response)
    }
}

fn resolve(index_url: &Url, path: &str) -> Result<Url> {
    index_url
        .join(path)
        .with_context(|| format!("invalid path `{}` for {}", path, index_url))
}
