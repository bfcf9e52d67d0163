use std::fmt;
use log::info;
use crate::profile::PolicyMode;

/// Two-letter status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Badge {
    #[default]
    Inactive,
    Active(PolicyMode),
}

impl Badge {
    pub fn text(&self) -> &'static str {
        match self {
            Badge::Inactive => "",
            Badge::Active(mode) => mode.label(),
        }
    }

    /// Background color, `None` when the badge is blank
    pub fn color(&self) -> Option<&'static str> {
        match self {
            Badge::Inactive => None,
            Badge::Active(PolicyMode::Whitelist) => Some("#805ad5"),
            Badge::Active(PolicyMode::Blacklist) => Some("#48bb78"),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.color() {
            Some(color) => write!(f, "{} ({})", self.text(), color),
            None => f.write_str("inactive"),
        }
    }
}

/// Sink for badge updates
pub trait Indicator: Send + Sync {
    fn show(&self, badge: &Badge);
}

/// Writes badge changes to the log
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn show(&self, badge: &Badge) {
        info!("Badge: {}", badge);
    }
}
