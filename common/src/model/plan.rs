use serde::{Deserialize, Serialize};

/// Pricing plan of a user, mapped to a fixed monthly draft cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Unlimited,
}

impl Plan {
    /// Monthly cap on successful draft generations. `None` means no cap.
    pub fn monthly_cap(self) -> Option<u32> {
        match self {
            Plan::Free => Some(3),
            Plan::Pro => Some(100),
            Plan::Unlimited => None,
        }
    }

    /// Parses the plan claim forwarded by the auth layer. Anything
    /// unrecognized is treated as the free tier.
    pub fn from_claim(claim: &str) -> Plan {
        match claim.trim().to_ascii_lowercase().as_str() {
            "pro" => Plan::Pro,
            "unlimited" => Plan::Unlimited,
            _ => Plan::Free,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Unlimited => "unlimited",
        }
    }
}
