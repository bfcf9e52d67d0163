// 代理策略编译
pub mod netmask;
pub mod pattern;
pub mod rules;
pub mod script;

pub use pattern::{compile_pattern, Condition};
pub use rules::{ProxyServer, RuleTable};
pub use script::{Decision, ProxyDirective, RoutingScript};

use crate::profile::{PolicyMode, ProxyProfile};

/// Configuration submitted to the host network layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyPayload {
    /// Per-request routing script (whitelist)
    Script(RoutingScript),
    /// Static rule table (blacklist)
    Rules(RuleTable),
}

impl ProxyPayload {
    pub fn mode(&self) -> &'static str {
        match self {
            ProxyPayload::Script(_) => "pac_script",
            ProxyPayload::Rules(_) => "fixed_servers",
        }
    }
}

/// Pick the strategy for `profile` and compile it. Pure: the same profile
/// always yields the same payload.
pub fn compile(profile: &ProxyProfile) -> ProxyPayload {
    match profile.policy_mode {
        PolicyMode::Whitelist => ProxyPayload::Script(RoutingScript::synthesize(profile)),
        PolicyMode::Blacklist => ProxyPayload::Rules(RuleTable::build(profile)),
    }
}
