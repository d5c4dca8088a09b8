//! Saved browser session used to authenticate against the notebook service.
//!
//! Profiles are JSON files. Cookies may be stored either as the list of cookie
//! objects a browser export produces or as a flat `name -> value` map.
use nlm_common::{NlmError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

const SESSION_COOKIE: &str = "SID";

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Cookies {
    List(Vec<BrowserCookie>),
    Map(BTreeMap<String, String>),
}

impl Cookies {
    fn len(&self) -> usize {
        match self {
            Cookies::List(l) => l.len(),
            Cookies::Map(m) => m.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthProfile {
    #[serde(default = "default_profile_name")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub cookies: Cookies,
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Cookie counts per domain, for diagnosing auth problems without printing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSummary {
    pub count: usize,
    pub domains: BTreeMap<String, usize>,
    pub has_sid: bool,
}

impl fmt::Display for CookieSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cookies: {}", self.count)?;
        writeln!(f, "Has SID cookie: {}", self.has_sid)?;
        writeln!(f, "Cookie domains:")?;
        for (domain, n) in &self.domains {
            writeln!(f, "  - {domain}: {n} cookies")?;
        }
        Ok(())
    }
}

impl AuthProfile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NlmError::Profile(format!("cannot read profile {}: {e}", path.display()))
        })?;
        let profile = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            profile = %profile.name,
            cookies = profile.cookies.len(),
            "profile.loaded"
        );
        Ok(profile)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let profile: AuthProfile = serde_json::from_str(raw)
            .map_err(|e| NlmError::Profile(format!("invalid profile JSON: {e}")))?;
        if profile.cookies.is_empty() {
            return Err(NlmError::Profile("profile contains no cookies".into()));
        }
        Ok(profile)
    }

    pub fn has_sid(&self) -> bool {
        match &self.cookies {
            Cookies::List(l) => l.iter().any(|c| c.name == SESSION_COOKIE),
            Cookies::Map(m) => m.contains_key(SESSION_COOKIE),
        }
    }

    /// `Cookie:` header value for requests to `host`.
    ///
    /// Listed cookies are kept when they have no domain or their domain matches
    /// `host`; a name is only sent once (first match wins).
    pub fn cookie_header_for(&self, host: &str) -> String {
        let pairs: Vec<(&str, &str)> = match &self.cookies {
            Cookies::Map(m) => m.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
            Cookies::List(l) => {
                let mut seen = HashSet::new();
                l.iter()
                    .filter(|c| c.domain.as_deref().is_none_or(|d| domain_matches(d, host)))
                    .filter(|c| seen.insert(c.name.as_str()))
                    .map(|c| (c.name.as_str(), c.value.as_str()))
                    .collect()
            }
        };
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn summary(&self) -> CookieSummary {
        let mut domains = BTreeMap::new();
        match &self.cookies {
            Cookies::List(l) => {
                for c in l {
                    let d = c.domain.clone().unwrap_or_else(|| "None".to_string());
                    *domains.entry(d).or_insert(0) += 1;
                }
            }
            Cookies::Map(m) => {
                domains.insert("None".to_string(), m.len());
            }
        }
        CookieSummary {
            count: self.cookies.len(),
            domains,
            has_sid: self.has_sid(),
        }
    }

    /// Refuse to overwrite this profile with a session from another account.
    pub fn ensure_same_account(&self, new_email: &str, force: bool) -> Result<()> {
        match &self.email {
            Some(stored) if !force && !stored.eq_ignore_ascii_case(new_email) => {
                Err(NlmError::AccountMismatch {
                    stored_email: stored.clone(),
                    new_email: new_email.to_string(),
                    profile_name: self.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let d = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    host == d || host.ends_with(&format!(".{d}"))
}
