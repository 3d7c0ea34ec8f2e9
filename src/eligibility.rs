//! Decides whether the current network is one to authenticate on

use crate::models::{EligibilityRule, IneligibleReason};
use crate::network::IdentityCache;
use crate::portal::CaptivePortal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { identifier: Option<String> },
    Ineligible(IneligibleReason),
}

pub struct EligibilityCheck {
    rule: EligibilityRule,
    cache: IdentityCache,
}

impl EligibilityCheck {
    pub fn new(rule: EligibilityRule, cache: IdentityCache) -> Self {
        Self { rule, cache }
    }

    pub fn set_rule(&mut self, rule: EligibilityRule) {
        self.rule = rule;
    }

    pub async fn evaluate(&mut self, portal: &dyn CaptivePortal) -> Eligibility {
        match &self.rule {
            // Bypasses the identity cache: one GET to the landing page per tick.
            EligibilityRule::PortalReachability => {
                if portal.is_reachable().await {
                    Eligibility::Eligible { identifier: None }
                } else {
                    Eligibility::Ineligible(IneligibleReason::PortalUnreachable)
                }
            }
            EligibilityRule::AllowedIdentifiers(allowed) => match self.cache.current().await {
                None => Eligibility::Ineligible(IneligibleReason::NoWifi),
                Some(ssid) if allowed.contains(&ssid) => Eligibility::Eligible {
                    identifier: Some(ssid),
                },
                Some(ssid) => Eligibility::Ineligible(IneligibleReason::NotAllowed(ssid)),
            },
        }
    }
}
