use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context as _, Result, bail};
use regex::Regex;

/// Release identifier grammar used by Python package indexes (PEP 440).
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        ^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>
            [-_.]?
            (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
            [-_.]?
            (?P<pre_n>[0-9]+)?
        )?
        (?P<post>
            (?:-(?P<post_n1>[0-9]+))
            |
            (?:
                [-_.]?
                (?P<post_l>post|rev|r)
                [-_.]?
                (?P<post_n2>[0-9]+)?
            )
        )?
        (?P<dev>
            [-_.]?
            (?P<dev_l>dev)
            [-_.]?
            (?P<dev_n>[0-9]+)?
        )?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .expect("version pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreRelease::Alpha,
            "b" | "beta" => PreRelease::Beta,
            _ => PreRelease::ReleaseCandidate,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::ReleaseCandidate => "rc",
        }
    }
}

/// One dot-separated piece of a local version label.
///
/// Variant order matters: alphanumeric segments sort before numeric ones.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocalSegment {
    Alphanumeric(String),
    Numeric(u128),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocalSegment::Alphanumeric(s) => write!(f, "{}", s),
            LocalSegment::Numeric(n) => write!(f, "{}", n),
        }
    }
}

/// A parsed release version with a total order, oldest first.
#[derive(Clone, Debug)]
pub struct Version {
    pub epoch: u128,
    pub release: Vec<u128>,
    pub pre: Option<(PreRelease, u128)>,
    pub post: Option<u128>,
    pub dev: Option<u128>,
    pub local: Option<Vec<LocalSegment>>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u128),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u128),
    None,
}

type SortKey<'a> = (
    u128,
    &'a [u128],
    PreKey,
    Option<u128>,
    DevKey,
    Option<&'a [LocalSegment]>,
);

impl Version {
    pub fn parse(s: &str) -> Result<Version> {
        let Some(caps) = VERSION_RE.captures(s) else {
            bail!("invalid version: '{}'", s);
        };
        let number = |name: &str| -> Result<Option<u128>> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u128>())
                .transpose()
                .with_context(|| format!("invalid version: '{}'", s))
        };

        let epoch = number("epoch")?.unwrap_or(0);
        let release = caps["release"]
            .split('.')
            .map(str::parse::<u128>)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid version: '{}'", s))?;
        let pre = match caps.name("pre_l") {
            Some(label) => Some((
                PreRelease::from_label(label.as_str()),
                number("pre_n")?.unwrap_or(0),
            )),
            None => None,
        };
        let post = if caps.name("post").is_some() {
            Some(number("post_n1")?.or(number("post_n2")?).unwrap_or(0))
        } else {
            None
        };
        let dev = if caps.name("dev").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };
        let local = caps.name("local").map(|m| {
            m.as_str()
                .split(['.', '-', '_'])
                .map(|part| match part.parse::<u128>() {
                    Ok(n) => LocalSegment::Numeric(n),
                    Err(_) => LocalSegment::Alphanumeric(part.to_ascii_lowercase()),
                })
                .collect()
        });

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    fn sort_key(&self) -> SortKey<'_> {
        // Trailing zeros never make a release newer: 1.0 == 1.0.0.
        let significant = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |idx| idx + 1);

        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((label, n)), _, _) => PreKey::Pre(label, n),
            (None, _, _) => PreKey::Final,
        };
        let dev = match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::None,
        };

        (
            self.epoch,
            &self.release[..significant],
            pre,
            self.post,
            dev,
            self.local.as_deref(),
        )
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        for (idx, part) in self.release.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
        }
        if let Some((label, n)) = self.pre {
            write!(f, "{}{}", label.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if let Some(local) = &self.local {
            f.write_str("+")?;
            for (idx, segment) in local.iter().enumerate() {
                if idx > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{}", segment)?;
            }
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
