//! Purpose classifier
//!
//! Maps an object path to the semantic role of the image with ordered,
//! case-sensitive substring tests. The first matching rule wins, so the order
//! of [`RULES`] is part of the naming contract with the uploaders.

use deriva_core::Purpose;

const RULES: &[(&str, Purpose)] = &[
    ("logo", Purpose::Logo),
    ("owner", Purpose::Profile),
    ("banner", Purpose::Banner),
    ("card", Purpose::Card),
    ("gallery", Purpose::Gallery),
    ("services", Purpose::ServiceThumb),
    ("rewards", Purpose::RewardThumb),
    ("clients", Purpose::ClientThumb),
];

/// Classify an object path. Total: unmatched paths are [`Purpose::Unknown`].
pub fn classify(path: &str) -> Purpose {
    RULES
        .iter()
        .find(|(needle, _)| path.contains(needle))
        .map(|(_, purpose)| *purpose)
        .unwrap_or(Purpose::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_rule() {
        assert_eq!(classify("businesses/abc123/logo.png"), Purpose::Logo);
        assert_eq!(classify("businesses/abc123/owner.jpg"), Purpose::Profile);
        assert_eq!(classify("events/e1/banner_raw.jpg"), Purpose::Banner);
        assert_eq!(classify("workshops/w1/card.jpg"), Purpose::Card);
        assert_eq!(classify("businesses/xyz/gallery/photo1.jpg"), Purpose::Gallery);
        assert_eq!(classify("businesses/xyz/services/s1.jpg"), Purpose::ServiceThumb);
        assert_eq!(classify("businesses/xyz/rewards/r1.png"), Purpose::RewardThumb);
        assert_eq!(classify("businesses/xyz/clients/c1.png"), Purpose::ClientThumb);
    }

    #[test]
    fn test_first_match_wins() {
        // logo is checked before gallery
        assert_eq!(classify("businesses/xyz/gallery/logo.png"), Purpose::Logo);
        // owner before banner
        assert_eq!(classify("businesses/xyz/owner_banner.png"), Purpose::Profile);
        // card before services
        assert_eq!(classify("businesses/xyz/services/card.png"), Purpose::Card);
        // rewards before clients
        assert_eq!(classify("businesses/clients/rewards/x.png"), Purpose::RewardThumb);
    }

    #[test]
    fn test_case_sensitive_and_total() {
        assert_eq!(classify("businesses/xyz/LOGO.png"), Purpose::Unknown);
        assert_eq!(classify("random/unrelated/file.txt"), Purpose::Unknown);
        assert_eq!(classify(""), Purpose::Unknown);
    }
}
