pub mod compiler;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod indicator;
pub mod manager;
pub mod profile;
pub mod session;
pub mod store;

pub use compiler::{compile, ProxyPayload, RoutingScript, RuleTable};
pub use controller::ProxyPolicyCompiler;
pub use error::{SwitchError, Result};
pub use host::{FileHost, ProxyHost, RecordingHost};
pub use indicator::{Badge, Indicator, LogIndicator};
pub use manager::{ProfileManager, RestoreOutcome, Status};
pub use profile::{Credentials, PolicyMode, ProfileDraft, ProxyProfile, ProxyProtocol};
pub use session::{AuthChallenge, ChallengeResponse, CredentialResponder, SessionContext};
pub use store::{JsonFileStore, MemoryStore, ProfileStore, StoreState};
