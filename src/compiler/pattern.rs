// 域名列表条目 -> 路由条件
use std::fmt;
use std::net::Ipv4Addr;
use lazy_static::lazy_static;
use regex::Regex;
use crate::compiler::netmask;

lazy_static! {
    // ASCII digits only; `\d` would accept any Unicode digit
    static ref CIDR_RE: Regex = Regex::new(r"^([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)/([0-9]+)$").unwrap();
    static ref IPV4_RE: Regex = Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+$").unwrap();
}

/// One compiled routing condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Resolved host address falls inside `network`/`mask`
    Cidr { network: String, mask: String },
    /// Request host equals the literal address, no DNS involved
    Literal(String),
    /// Apex domain or any subdomain of it
    Wildcard(String),
    /// Single `dnsDomainIs` suffix test
    Domain(String),
}

/// Classify a domain-list entry. First match wins: CIDR, literal IPv4,
/// `*.` wildcard, then plain domain. Entries that look like nothing in
/// particular end up as plain domains.
pub fn compile_pattern(pattern: &str) -> Condition {
    if let Some(caps) = CIDR_RE.captures(pattern) {
        // Out-of-range prefixes are kept; only digits overflowing a u32
        // drop through to the plain-domain case
        if let Ok(prefix) = caps[2].parse::<u32>() {
            return Condition::Cidr {
                network: caps[1].to_string(),
                mask: netmask::mask(prefix),
            };
        }
    }
    if IPV4_RE.is_match(pattern) {
        return Condition::Literal(pattern.to_string());
    }
    if let Some(domain) = pattern.strip_prefix("*.") {
        return Condition::Wildcard(domain.to_string());
    }
    Condition::Domain(pattern.to_string())
}

pub fn compile_patterns(patterns: &[String]) -> Vec<Condition> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

impl Condition {
    /// Evaluate against a request host, using `resolve` where the PAC
    /// side would call `dnsResolve`.
    pub fn matches<F>(&self, host: &str, resolve: F) -> bool
    where
        F: Fn(&str) -> Option<Ipv4Addr>,
    {
        match self {
            Condition::Cidr { network, mask } => match resolve(host) {
                Some(addr) => is_in_net(addr, network, mask),
                None => false,
            },
            Condition::Literal(ip) => host == ip,
            Condition::Wildcard(domain) => {
                dns_domain_is(host, &format!(".{}", domain)) || dns_domain_is(host, domain)
            }
            Condition::Domain(domain) => dns_domain_is(host, domain),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Cidr { network, mask } => {
                write!(f, "isInNet(dnsResolve(host), \"{}\", \"{}\")", network, mask)
            }
            Condition::Literal(ip) => write!(f, "host === \"{}\"", ip),
            Condition::Wildcard(domain) => write!(
                f,
                "dnsDomainIs(host, \".{}\") || dnsDomainIs(host, \"{}\")",
                domain, domain
            ),
            Condition::Domain(domain) => write!(f, "dnsDomainIs(host, \"{}\")", domain),
        }
    }
}

fn dns_domain_is(host: &str, domain: &str) -> bool {
    host.ends_with(domain)
}

fn is_in_net(addr: Ipv4Addr, network: &str, mask: &str) -> bool {
    let (Ok(network), Ok(mask)) = (network.parse::<Ipv4Addr>(), mask.parse::<Ipv4Addr>()) else {
        return false;
    };
    let mask = u32::from(mask);
    u32::from(addr) & mask == u32::from(network) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_only(host: &str) -> Option<Ipv4Addr> {
        host.parse().ok()
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(
            compile_pattern("172.16.0.0/12"),
            Condition::Cidr { network: "172.16.0.0".to_string(), mask: "255.240.0.0".to_string() }
        );
        assert_eq!(compile_pattern("10.1.2.3"), Condition::Literal("10.1.2.3".to_string()));
        assert_eq!(compile_pattern("*.example.com"), Condition::Wildcard("example.com".to_string()));
        assert_eq!(compile_pattern("example.com"), Condition::Domain("example.com".to_string()));
    }

    #[test]
    fn test_out_of_range_prefix_stays_cidr() {
        assert_eq!(
            compile_pattern("10.0.0.0/40"),
            Condition::Cidr { network: "10.0.0.0".to_string(), mask: "255.255.255.255.255".to_string() }
        );
        let Condition::Cidr { network, mask } = compile_pattern("10.0.0.0/256") else {
            panic!("expected a CIDR condition");
        };
        assert_eq!(network, "10.0.0.0");
        assert_eq!(mask.split('.').count(), 32);

        let cond = compile_pattern("10.0.0.0/999");
        assert!(matches!(cond, Condition::Cidr { .. }));
        assert!(cond.to_string().starts_with(r#"isInNet(dnsResolve(host), "10.0.0.0", "255.255."#));
        // a mask longer than four octets never matches
        assert!(!cond.matches("10.0.0.1", literal_only));
    }

    #[test]
    fn test_malformed_entries_fall_through_to_domain() {
        assert_eq!(
            compile_pattern("10.0.0.0/99999999999"),
            Condition::Domain("10.0.0.0/99999999999".to_string())
        );
        assert_eq!(compile_pattern("1.2.3"), Condition::Domain("1.2.3".to_string()));
        assert_eq!(compile_pattern("*"), Condition::Domain("*".to_string()));
    }

    #[test]
    fn test_non_ascii_digits_are_domains() {
        assert_eq!(compile_pattern("١.٢.٣.٤"), Condition::Domain("١.٢.٣.٤".to_string()));
        assert_eq!(compile_pattern("١.٢.٣.٤/٨"), Condition::Domain("١.٢.٣.٤/٨".to_string()));
    }

    #[test]
    fn test_rendering() {
        assert_eq!(
            compile_pattern("192.168.0.0/24").to_string(),
            r#"isInNet(dnsResolve(host), "192.168.0.0", "255.255.255.0")"#
        );
        assert_eq!(compile_pattern("10.1.2.3").to_string(), r#"host === "10.1.2.3""#);
        assert_eq!(
            compile_pattern("*.corp.kr").to_string(),
            r#"dnsDomainIs(host, ".corp.kr") || dnsDomainIs(host, "corp.kr")"#
        );
        assert_eq!(compile_pattern("corp.kr").to_string(), r#"dnsDomainIs(host, "corp.kr")"#);
    }

    #[test]
    fn test_cidr_membership_uses_resolver() {
        let cond = compile_pattern("192.168.1.0/24");
        assert!(cond.matches("192.168.1.77", literal_only));
        assert!(!cond.matches("192.168.2.1", literal_only));
        assert!(!cond.matches("intranet", literal_only));
        assert!(cond.matches("intranet", |_| Some(Ipv4Addr::new(192, 168, 1, 5))));
    }

    #[test]
    fn test_literal_ip_skips_dns() {
        let cond = compile_pattern("10.0.0.1");
        assert!(cond.matches("10.0.0.1", |_| None));
        assert!(!cond.matches("gateway", |_| Some(Ipv4Addr::new(10, 0, 0, 1))));
    }

    #[test]
    fn test_wildcard_and_domain() {
        let wildcard = compile_pattern("*.example.com");
        assert!(wildcard.matches("example.com", literal_only));
        assert!(wildcard.matches("a.b.example.com", literal_only));
        assert!(!wildcard.matches("other.com", literal_only));

        let domain = compile_pattern("example.com");
        assert!(domain.matches("example.com", literal_only));
        assert!(domain.matches("www.example.com", literal_only));
        assert!(!domain.matches("example.org", literal_only));
    }
}
