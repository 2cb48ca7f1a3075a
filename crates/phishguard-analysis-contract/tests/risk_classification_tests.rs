//! Integration tests for probability classification.

use phishguard_analysis_contract::classify;
use phishguard_core::{Label, RiskTier};

#[test]
fn risk_classification_tests_label_flips_at_half() {
    for step in 0..=100 {
        let probability = f64::from(step) / 100.0;
        let expected = if probability >= 0.5 {
            Label::Phishing
        } else {
            Label::Legitimate
        };
        assert_eq!(classify(probability).label, expected, "p={probability}");
    }
}

#[test]
fn risk_classification_tests_boundaries_belong_to_higher_tier() {
    assert_eq!(classify(0.2).tier, RiskTier::Low);
    assert_eq!(classify(0.4).tier, RiskTier::Moderate);
    assert_eq!(classify(0.6).tier, RiskTier::High);
    assert_eq!(classify(0.8).tier, RiskTier::Critical);
    assert_eq!(classify(0.5).label, Label::Phishing);
}

#[test]
fn risk_classification_tests_tier_names_are_display_safe() {
    assert_eq!(classify(0.05).tier.display_name(), "Very Low");
    assert_eq!(classify(0.95).tier.to_string(), "Critical");
}
