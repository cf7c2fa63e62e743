use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RecordError;

/// Content-scope predicate family a rule uses to decide whether it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every page.
    #[default]
    SiteWide,
    /// Any single post.
    SinglePosts,
    /// The archive listing of one category.
    CategoryArchive,
    /// Single posts filed under one category.
    SinglePostsCategory,
    /// One specific page.
    Page,
}

impl MatchMode {
    pub const ALL: [MatchMode; 5] = [
        MatchMode::SiteWide,
        MatchMode::SinglePosts,
        MatchMode::CategoryArchive,
        MatchMode::SinglePostsCategory,
        MatchMode::Page,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::SiteWide => "site_wide",
            MatchMode::SinglePosts => "single_posts",
            MatchMode::CategoryArchive => "category_archive",
            MatchMode::SinglePostsCategory => "single_posts_category",
            MatchMode::Page => "page",
        }
    }

    /// Whether the predicate needs `category_id` to be configured.
    #[must_use]
    pub fn needs_category(self) -> bool {
        matches!(
            self,
            MatchMode::CategoryArchive | MatchMode::SinglePostsCategory
        )
    }

    /// Whether the predicate needs `page_id` to be configured.
    #[must_use]
    pub fn needs_page(self) -> bool {
        self == MatchMode::Page
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| RecordError::UnknownMatchMode {
                value: s.to_owned(),
            })
    }
}

/// Client device class a rule is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTarget {
    #[default]
    Both,
    Desktop,
    Mobile,
}

impl DeviceTarget {
    pub const ALL: [DeviceTarget; 3] = [
        DeviceTarget::Both,
        DeviceTarget::Desktop,
        DeviceTarget::Mobile,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceTarget::Both => "both",
            DeviceTarget::Desktop => "desktop",
            DeviceTarget::Mobile => "mobile",
        }
    }

    /// Returns `false` when the device class excludes the visitor.
    #[must_use]
    pub fn allows(self, is_mobile: bool) -> bool {
        match self {
            DeviceTarget::Both => true,
            DeviceTarget::Desktop => !is_mobile,
            DeviceTarget::Mobile => is_mobile,
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceTarget {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceTarget::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| RecordError::UnknownDeviceTarget {
                value: s.to_owned(),
            })
    }
}

/// Positioning container applied around resolved code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Right,
    Center,
}

impl Alignment {
    pub const ALL: [Alignment; 4] = [
        Alignment::None,
        Alignment::Left,
        Alignment::Right,
        Alignment::Center,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::None => "none",
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Alignment::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| RecordError::UnknownAlignment {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_mode_parse_round_trip() {
        for mode in MatchMode::ALL {
            assert_eq!(mode.as_str().parse::<MatchMode>(), Ok(mode));
        }
    }

    #[test]
    fn legacy_page_category_is_rejected() {
        assert_eq!(
            "page_category".parse::<MatchMode>(),
            Err(RecordError::UnknownMatchMode {
                value: "page_category".into()
            })
        );
    }

    #[test]
    fn target_requirements() {
        assert!(MatchMode::Page.needs_page());
        assert!(!MatchMode::Page.needs_category());
        assert!(MatchMode::CategoryArchive.needs_category());
        assert!(MatchMode::SinglePostsCategory.needs_category());
        assert!(!MatchMode::SiteWide.needs_page());
        assert!(!MatchMode::SinglePosts.needs_category());
    }

    #[test]
    fn device_allows() {
        assert!(DeviceTarget::Both.allows(true));
        assert!(DeviceTarget::Both.allows(false));
        assert!(DeviceTarget::Desktop.allows(false));
        assert!(!DeviceTarget::Desktop.allows(true));
        assert!(DeviceTarget::Mobile.allows(true));
        assert!(!DeviceTarget::Mobile.allows(false));
    }

    #[test]
    fn alignment_parse_trims() {
        assert_eq!(" center ".parse::<Alignment>(), Ok(Alignment::Center));
        assert!("justify".parse::<Alignment>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MatchMode::SinglePostsCategory).unwrap();
        assert_eq!(json, "\"single_posts_category\"");
        let back: DeviceTarget = serde_json::from_str("\"mobile\"").unwrap();
        assert_eq!(back, DeviceTarget::Mobile);
    }
}
