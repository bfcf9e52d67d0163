// 白名单模式：条件列表 -> PAC 脚本
use std::fmt;
use std::net::Ipv4Addr;
use crate::compiler::pattern::{compile_patterns, Condition};
use crate::profile::ProxyProfile;

/// Proxy target returned by the script when a condition holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyDirective {
    /// `PROXY host:port`, used for http, https and all
    Proxy { host: String, port: i64 },
    /// `SOCKS host:port`, used for socks4 and socks5
    Socks { host: String, port: i64 },
}

impl ProxyDirective {
    pub fn for_profile(profile: &ProxyProfile) -> Self {
        let host = profile.host.clone();
        let port = profile.port;
        if profile.protocol.is_socks() {
            ProxyDirective::Socks { host, port }
        } else {
            ProxyDirective::Proxy { host, port }
        }
    }
}

impl fmt::Display for ProxyDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyDirective::Proxy { host, port } => write!(f, "PROXY {}:{}", host, port),
            ProxyDirective::Socks { host, port } => write!(f, "SOCKS {}:{}", host, port),
        }
    }
}

/// Routing outcome for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proxy(ProxyDirective),
    Direct,
}

/// Structured form of the generated `FindProxyForURL` script.
/// The conditions are OR-ed; an empty list never proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingScript {
    pub conditions: Vec<Condition>,
    pub proxy: ProxyDirective,
}

impl RoutingScript {
    pub fn synthesize(profile: &ProxyProfile) -> Self {
        Self {
            conditions: compile_patterns(&profile.domain_list),
            proxy: ProxyDirective::for_profile(profile),
        }
    }

    /// Evaluate the condition list for `host`
    pub fn decide<F>(&self, host: &str, resolve: F) -> Decision
    where
        F: Fn(&str) -> Option<Ipv4Addr>,
    {
        if self.conditions.iter().any(|c| c.matches(host, &resolve)) {
            Decision::Proxy(self.proxy.clone())
        } else {
            Decision::Direct
        }
    }

    fn disjunction(&self) -> String {
        if self.conditions.is_empty() {
            return "false".to_string();
        }
        self.conditions
            .iter()
            .map(|c| format!("({})", c))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    /// Script source handed to the host network layer
    pub fn render(&self) -> String {
        format!(
            "function FindProxyForURL(url, host) {{\n  if ({}) {{\n    return \"{}\";\n  }}\n  return \"DIRECT\";\n}}\n",
            self.disjunction(),
            self.proxy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PolicyMode, ProfileDraft, ProxyProtocol};

    fn whitelist(protocol: ProxyProtocol, domains: &[&str]) -> ProxyProfile {
        let draft = ProfileDraft::new("wl", protocol, "proxy.local", 3128).with_policy(
            PolicyMode::Whitelist,
            domains.iter().map(|d| d.to_string()).collect(),
        );
        ProxyProfile::from_draft("1".to_string(), draft)
    }

    fn no_dns(host: &str) -> Option<Ipv4Addr> {
        host.parse().ok()
    }

    #[test]
    fn test_empty_list_always_direct() {
        let script = RoutingScript::synthesize(&whitelist(ProxyProtocol::Http, &[]));
        for host in ["example.com", "localhost", "10.0.0.1", ""] {
            assert_eq!(script.decide(host, no_dns), Decision::Direct);
        }
        assert!(script.render().contains("if (false)"));
    }

    #[test]
    fn test_wildcard_covers_apex_and_subdomains() {
        let script = RoutingScript::synthesize(&whitelist(ProxyProtocol::Http, &["*.example.com"]));
        let proxied = Decision::Proxy(ProxyDirective::Proxy { host: "proxy.local".to_string(), port: 3128 });
        assert_eq!(script.decide("example.com", no_dns), proxied);
        assert_eq!(script.decide("sub.example.com", no_dns), proxied);
        assert_eq!(script.decide("other.com", no_dns), Decision::Direct);
    }

    #[test]
    fn test_socks_directive() {
        let script = RoutingScript::synthesize(&whitelist(ProxyProtocol::Socks5, &["corp.kr"]));
        assert_eq!(script.proxy.to_string(), "SOCKS proxy.local:3128");
        let script = RoutingScript::synthesize(&whitelist(ProxyProtocol::All, &["corp.kr"]));
        assert_eq!(script.proxy.to_string(), "PROXY proxy.local:3128");
    }

    #[test]
    fn test_render_layout() {
        let script = RoutingScript::synthesize(&whitelist(
            ProxyProtocol::Https,
            &["10.0.0.0/8", "internal.site.kr"],
        ));
        let expected = "function FindProxyForURL(url, host) {\n  if ((isInNet(dnsResolve(host), \"10.0.0.0\", \"255.0.0.0\")) || (dnsDomainIs(host, \"internal.site.kr\"))) {\n    return \"PROXY proxy.local:3128\";\n  }\n  return \"DIRECT\";\n}\n";
        assert_eq!(script.render(), expected);
    }

    #[test]
    fn test_condition_order_does_not_change_decision() {
        let a = RoutingScript::synthesize(&whitelist(ProxyProtocol::Http, &["a.com", "10.0.0.0/8"]));
        let b = RoutingScript::synthesize(&whitelist(ProxyProtocol::Http, &["10.0.0.0/8", "a.com"]));
        for host in ["a.com", "x.a.com", "10.2.3.4", "b.com"] {
            assert_eq!(a.decide(host, no_dns), b.decide(host, no_dns));
        }
    }
}
