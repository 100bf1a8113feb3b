use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::{BUSINESSES_PREFIX, EVENTS_PREFIX, WORKSHOPS_PREFIX};

/// Content domain an upload belongs to.
///
/// Each category owns one pipeline instance and one sizing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Businesses,
    Events,
    Workshops,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Businesses, Category::Events, Category::Workshops];

    /// Root prefix of the category in the storage namespace, including the trailing slash.
    pub fn root_prefix(self) -> &'static str {
        match self {
            Category::Businesses => BUSINESSES_PREFIX,
            Category::Events => EVENTS_PREFIX,
            Category::Workshops => WORKSHOPS_PREFIX,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Businesses => "businesses",
            Category::Events => "events",
            Category::Workshops => "workshops",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Semantic role of an image, inferred from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Logo,
    Profile,
    Banner,
    Card,
    Gallery,
    ServiceThumb,
    ClientThumb,
    RewardThumb,
    Unknown,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Logo => "logo",
            Purpose::Profile => "profile",
            Purpose::Banner => "banner",
            Purpose::Card => "card",
            Purpose::Gallery => "gallery",
            Purpose::ServiceThumb => "service_thumb",
            Purpose::ClientThumb => "client_thumb",
            Purpose::RewardThumb => "reward_thumb",
            Purpose::Unknown => "unknown",
        }
    }
}

impl Display for Purpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_prefixes() {
        assert_eq!(Category::Businesses.root_prefix(), "businesses/");
        assert_eq!(Category::Events.root_prefix(), "events/");
        assert_eq!(Category::Workshops.root_prefix(), "workshops/");
    }
}
