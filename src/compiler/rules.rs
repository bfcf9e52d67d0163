// 黑名单模式：固定代理规则表
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use ipnet::IpNet;
use crate::profile::{ProxyProfile, ProxyProtocol, DEFAULT_BYPASS};

/// A proxy endpoint in the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyServer {
    pub scheme: String,
    pub host: String,
    pub port: i64,
}

/// Static proxy rules plus the list of hosts that bypass them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_proxy: Option<ProxyServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_for_http: Option<ProxyServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_for_https: Option<ProxyServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_proxy: Option<ProxyServer>,
    pub bypass_list: Vec<String>,
}

impl RuleTable {
    pub fn build(profile: &ProxyProfile) -> Self {
        let bypass_list = if profile.domain_list.is_empty() {
            DEFAULT_BYPASS.iter().map(|s| s.to_string()).collect()
        } else {
            profile.domain_list.clone()
        };

        let server = ProxyServer {
            scheme: profile.protocol.scheme().to_string(),
            host: profile.host.clone(),
            port: profile.port,
        };

        let mut table = RuleTable {
            single_proxy: None,
            proxy_for_http: None,
            proxy_for_https: None,
            fallback_proxy: None,
            bypass_list,
        };
        match profile.protocol {
            // scheme() already maps `all` to http
            ProxyProtocol::All => table.single_proxy = Some(server),
            ProxyProtocol::Http => table.proxy_for_http = Some(server),
            ProxyProtocol::Https => table.proxy_for_https = Some(server),
            ProxyProtocol::Socks4 | ProxyProtocol::Socks5 => table.fallback_proxy = Some(server),
        }
        table
    }

    /// Proxy a request to `host` over `url_scheme` would use, `None` for direct
    pub fn select(&self, url_scheme: &str, host: &str) -> Option<&ProxyServer> {
        if self.is_bypassed(host) {
            return None;
        }
        if let Some(single) = &self.single_proxy {
            return Some(single);
        }
        let slot = match url_scheme {
            "http" => self.proxy_for_http.as_ref(),
            "https" => self.proxy_for_https.as_ref(),
            _ => None,
        };
        slot.or(self.fallback_proxy.as_ref())
    }

    pub fn is_bypassed(&self, host: &str) -> bool {
        let ip: Option<IpAddr> = host.parse().ok();
        self.bypass_list.iter().any(|entry| {
            if entry.eq_ignore_ascii_case(host) {
                return true;
            }
            if let Some(suffix) = entry.strip_prefix('*') {
                // "*.example.com" also covers the apex
                return host.ends_with(suffix) || suffix.strip_prefix('.') == Some(host);
            }
            if entry.starts_with('.') {
                return host.ends_with(entry.as_str());
            }
            match (ip, entry.parse::<IpNet>()) {
                (Some(ip), Ok(net)) => net.contains(&ip),
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ProfileDraft, PolicyMode};

    fn blacklist(protocol: ProxyProtocol, domains: &[&str]) -> ProxyProfile {
        let draft = ProfileDraft::new("bl", protocol, "10.0.0.1", 8080).with_policy(
            PolicyMode::Blacklist,
            domains.iter().map(|d| d.to_string()).collect(),
        );
        ProxyProfile::from_draft("1".to_string(), draft)
    }

    #[test]
    fn test_all_uses_single_http_proxy_and_default_bypass() {
        let table = RuleTable::build(&blacklist(ProxyProtocol::All, &[]));
        assert_eq!(table.bypass_list, vec!["localhost", "127.0.0.1"]);
        let single = table.single_proxy.as_ref().unwrap();
        assert_eq!(single.scheme, "http");
        assert_eq!(single.port, 8080);
        assert!(table.proxy_for_http.is_none());
        assert!(table.fallback_proxy.is_none());
    }

    #[test]
    fn test_https_populates_only_https_slot() {
        let table = RuleTable::build(&blacklist(ProxyProtocol::Https, &[]));
        assert!(table.proxy_for_https.is_some());
        assert!(table.proxy_for_http.is_none());
        assert!(table.fallback_proxy.is_none());
        assert!(table.single_proxy.is_none());
        assert_eq!(table.bypass_list, vec!["localhost", "127.0.0.1"]);

        assert!(table.select("https", "example.com").is_some());
        assert!(table.select("http", "example.com").is_none());
    }

    #[test]
    fn test_socks_fills_fallback_and_catches_unassigned() {
        let table = RuleTable::build(&blacklist(ProxyProtocol::Socks5, &["*.corp.kr"]));
        let fallback = table.fallback_proxy.as_ref().unwrap();
        assert_eq!(fallback.scheme, "socks5");
        assert_eq!(table.bypass_list, vec!["*.corp.kr"]);
        assert_eq!(table.select("http", "example.com"), Some(fallback));
        assert_eq!(table.select("ftp", "example.com"), Some(fallback));
        assert!(table.select("http", "mail.corp.kr").is_none());
        assert!(table.select("http", "corp.kr").is_none());
    }

    #[test]
    fn test_bypass_cidr_and_literal() {
        let table = RuleTable::build(&blacklist(ProxyProtocol::All, &["192.168.0.0/16", "intranet"]));
        assert!(table.is_bypassed("192.168.10.4"));
        assert!(table.is_bypassed("intranet"));
        assert!(!table.is_bypassed("8.8.8.8"));
        assert!(table.select("http", "8.8.8.8").is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let table = RuleTable::build(&blacklist(ProxyProtocol::Http, &[]));
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["proxyForHttp"]["host"], "10.0.0.1");
        assert!(value.get("proxyForHttps").is_none());
        assert_eq!(value["bypassList"][1], "127.0.0.1");
    }
}
