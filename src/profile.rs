use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use crate::error::{Result, SwitchError};

/// Bypass entries used when a blacklist profile lists no domains
pub const DEFAULT_BYPASS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Proxy protocol declared by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    /// One proxy for every protocol
    All,
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyProtocol {
    /// Scheme tag used on the wire. `All` reports as `http`.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::All | ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks4 => "socks4",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    pub fn is_socks(&self) -> bool {
        matches!(self, ProxyProtocol::Socks4 | ProxyProtocol::Socks5)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::All => "all",
            other => other.scheme(),
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProxyProtocol {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ProxyProtocol::All),
            "http" => Ok(ProxyProtocol::Http),
            "https" => Ok(ProxyProtocol::Https),
            "socks4" => Ok(ProxyProtocol::Socks4),
            "socks5" => Ok(ProxyProtocol::Socks5),
            other => Err(SwitchError::InvalidProfile(format!("unknown protocol: {}", other))),
        }
    }
}

/// How the domain list is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Proxy everything, listed hosts go direct
    #[default]
    Blacklist,
    /// Direct by default, listed hosts go through the proxy
    Whitelist,
}

impl PolicyMode {
    /// Short label shown on the badge and in status lines
    pub fn label(&self) -> &'static str {
        match self {
            PolicyMode::Blacklist => "BL",
            PolicyMode::Whitelist => "WL",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::Blacklist => f.write_str("blacklist"),
            PolicyMode::Whitelist => f.write_str("whitelist"),
        }
    }
}

impl std::str::FromStr for PolicyMode {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blacklist" | "bl" => Ok(PolicyMode::Blacklist),
            "whitelist" | "wl" => Ok(PolicyMode::Whitelist),
            other => Err(SwitchError::InvalidProfile(format!("unknown policy mode: {}", other))),
        }
    }
}

/// Username/password pair answered to proxy auth challenges
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A named, persisted proxy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "protocol")]
    pub protocol: ProxyProtocol,
    pub host: String,
    /// Stored as-is; the range is only checked on [`ProfileDraft`]
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: i64,
    #[serde(default)]
    pub policy_mode: PolicyMode,
    #[serde(default)]
    pub domain_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxyProfile {
    pub fn from_draft(id: String, draft: ProfileDraft) -> Self {
        Self {
            id,
            name: draft.name,
            protocol: draft.protocol,
            host: draft.host,
            port: draft.port,
            policy_mode: draft.policy_mode,
            domain_list: draft.domain_list,
            username: draft.username,
            password: draft.password,
        }
    }

    /// Credentials to inject, present only for a non-empty username
    pub fn credentials(&self) -> Option<Credentials> {
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => Some(Credentials {
                username: user.to_string(),
                password: self.password.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// `host:port · N domains` summary used in listings
    pub fn summary(&self) -> String {
        if self.domain_list.is_empty() {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("{}:{} · {} domains", self.host, self.port, self.domain_list.len())
        }
    }
}

/// User-editable profile fields, validated before they reach the store
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDraft {
    pub name: String,
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: i64,
    pub policy_mode: PolicyMode,
    pub domain_list: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProfileDraft {
    pub fn new(name: &str, protocol: ProxyProtocol, host: &str, port: i64) -> Self {
        Self {
            name: name.trim().to_string(),
            protocol,
            host: host.trim().to_string(),
            port,
            policy_mode: PolicyMode::default(),
            domain_list: Vec::new(),
            username: None,
            password: None,
        }
    }

    pub fn with_policy(mut self, mode: PolicyMode, domains: Vec<String>) -> Self {
        self.policy_mode = mode;
        self.domain_list = domains;
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Name, host and port are required. Domain entries are not checked.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SwitchError::InvalidProfile("name is required".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(SwitchError::InvalidProfile("host is required".to_string()));
        }
        if !(1..=65535).contains(&self.port) {
            return Err(SwitchError::InvalidProfile("port must be between 1 and 65535".to_string()));
        }
        Ok(())
    }
}

/// Accept whatever an older store holds for `port`: numbers, numeric
/// strings (leading digits, like `parseInt`) or `null`, which reads as 0.
fn lenient_port<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<RawPort>::deserialize(deserializer)? {
        Some(RawPort::Int(n)) => n,
        Some(RawPort::Float(f)) => f as i64,
        Some(RawPort::Text(s)) => leading_int(&s),
        None => 0,
    })
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Split a comma separated domain list, dropping blank entries
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
