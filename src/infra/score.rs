//! Domain-infrastructure scoring: additive weights over a base of 50,
//! clamped to [0, 100]. Auxiliary to the decision engine.

use serde::{Deserialize, Serialize};

use super::types::{DomainInfra, WebStatus};

const BASE_SCORE: i32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraScore {
    pub score: u8,
    pub reasons: Vec<String>,
}

pub fn score_domain_infra(infra: &DomainInfra) -> InfraScore {
    let mut score = BASE_SCORE;
    let mut reasons = Vec::new();

    if let Some(age) = infra.domain_age_days {
        if age >= 730 {
            score += 15;
            reasons.push("Old domain".to_string());
        } else if age >= 180 {
            score += 8;
            reasons.push("Mid-age domain".to_string());
        } else {
            score -= 15;
            reasons.push("New domain".to_string());
        }
    }

    if infra.has_spf {
        score += 10;
        reasons.push("SPF configured".to_string());
    } else {
        score -= 20;
        reasons.push("No SPF".to_string());
    }

    if infra.has_dmarc {
        score += 10;
        reasons.push("DMARC configured".to_string());
    } else {
        score -= 10;
        reasons.push("No DMARC".to_string());
    }

    match infra.web_status {
        WebStatus::Active => {
            score += 15;
            reasons.push("Active website".to_string());
        }
        WebStatus::Parking => {
            score -= 30;
            reasons.push("Parking domain".to_string());
        }
        WebStatus::None => {
            score -= 15;
            reasons.push("No website".to_string());
        }
    }

    if infra.https {
        score += 5;
        reasons.push("HTTPS enabled".to_string());
    } else {
        score -= 5;
        reasons.push("No HTTPS".to_string());
    }

    InfraScore {
        score: score.clamp(0, 100) as u8,
        reasons,
    }
}
