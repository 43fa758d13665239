//! Social platform definitions and per-platform post validation.
//!
//! Each platform has a rule set covering body length, hashtag count, allowed
//! media aspect ratios, and media item count. Validation collects every
//! violation rather than stopping at the first, so the composer UI can show
//! the full list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::Error;

/// A supported social platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X,
    Instagram,
    Tiktok,
    Youtube,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::X,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Youtube,
        Platform::Facebook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::X => "x",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Facebook => "facebook",
        }
    }

    pub fn rules(&self) -> PlatformRules {
        match self {
            Platform::X => PlatformRules {
                max_chars: 280,
                max_hashtags: 5,
                allowed_aspect_ratios: None,
                max_media: None,
            },
            Platform::Instagram => PlatformRules {
                max_chars: 2200,
                max_hashtags: 30,
                allowed_aspect_ratios: Some(&["1:1", "4:5", "9:16"]),
                max_media: Some(10),
            },
            Platform::Tiktok => PlatformRules {
                max_chars: 2200,
                max_hashtags: 10,
                allowed_aspect_ratios: Some(&["9:16"]),
                max_media: None,
            },
            Platform::Youtube => PlatformRules {
                max_chars: 5000,
                max_hashtags: 15,
                allowed_aspect_ratios: Some(&["16:9", "9:16"]),
                max_media: None,
            },
            Platform::Facebook => PlatformRules {
                max_chars: 63206,
                max_hashtags: 30,
                allowed_aspect_ratios: None,
                max_media: Some(10),
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" | "twitter" => Ok(Platform::X),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "youtube" => Ok(Platform::Youtube),
            "facebook" => Ok(Platform::Facebook),
            other => Err(Error::BadRequest {
                message: format!("Unknown platform: {other}"),
            }),
        }
    }
}

/// Validation limits for one platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRules {
    /// Maximum body length in characters (unicode scalar values)
    pub max_chars: usize,
    /// Maximum number of hashtags
    pub max_hashtags: usize,
    /// Accepted media aspect ratios, None means any
    pub allowed_aspect_ratios: Option<&'static [&'static str]>,
    /// Maximum media items, None means no limit
    pub max_media: Option<i32>,
}

/// A draft post variant to validate against one platform's rules.
#[derive(Debug, Clone)]
pub struct VariantDraft<'a> {
    pub body: &'a str,
    pub hashtags: &'a [String],
    pub media_aspect_ratio: Option<&'a str>,
    pub media_count: i32,
}

/// Check a draft against the platform's rule set, returning every violation.
/// An empty list means the draft is valid.
pub fn validate_variant(platform: Platform, draft: &VariantDraft<'_>) -> Vec<String> {
    let rules = platform.rules();
    let mut issues = Vec::new();

    let char_count = draft.body.chars().count();
    if char_count > rules.max_chars {
        issues.push(format!(
            "Body is {char_count} characters, {platform} allows at most {}",
            rules.max_chars
        ));
    }

    if draft.hashtags.len() > rules.max_hashtags {
        issues.push(format!(
            "{} hashtags, {platform} allows at most {}",
            draft.hashtags.len(),
            rules.max_hashtags
        ));
    }

    for tag in draft.hashtags {
        if tag.trim().is_empty() {
            issues.push("Hashtags must not be empty".to_string());
            break;
        }
    }

    if let (Some(allowed), Some(ratio)) = (rules.allowed_aspect_ratios, draft.media_aspect_ratio) {
        if !allowed.contains(&ratio) {
            issues.push(format!(
                "Aspect ratio {ratio} is not supported on {platform}, expected one of: {}",
                allowed.join(", ")
            ));
        }
    }

    if let Some(max_media) = rules.max_media {
        if draft.media_count > max_media {
            issues.push(format!(
                "{} media items, {platform} allows at most {max_media}",
                draft.media_count
            ));
        }
    }

    if draft.media_count < 0 {
        issues.push("Media count must not be negative".to_string());
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft<'a>(body: &'a str, hashtags: &'a [String]) -> VariantDraft<'a> {
        VariantDraft {
            body,
            hashtags,
            media_aspect_ratio: None,
            media_count: 0,
        }
    }

    #[test]
    fn test_platform_string_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!("twitter".parse::<Platform>().unwrap(), Platform::X);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_x_body_limit() {
        let ok = "a".repeat(280);
        assert!(validate_variant(Platform::X, &draft(&ok, &[])).is_empty());

        let over = "a".repeat(281);
        let issues = validate_variant(Platform::X, &draft(&over, &[]));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("280"));
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        // 280 multibyte characters is exactly at the limit
        let body = "ü".repeat(280);
        assert!(validate_variant(Platform::X, &draft(&body, &[])).is_empty());
    }

    #[test]
    fn test_hashtag_limits() {
        let tags: Vec<String> = (0..6).map(|i| format!("tag{i}")).collect();
        let issues = validate_variant(Platform::X, &draft("hi", &tags));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("hashtags"));

        // Instagram allows 30
        assert!(validate_variant(Platform::Instagram, &draft("hi", &tags)).is_empty());
    }

    #[test]
    fn test_aspect_ratio_rules() {
        let tags: Vec<String> = vec![];
        let mut d = draft("hi", &tags);
        d.media_aspect_ratio = Some("16:9");
        d.media_count = 1;

        // TikTok only accepts 9:16
        let issues = validate_variant(Platform::Tiktok, &d);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("16:9"));

        // YouTube accepts 16:9
        assert!(validate_variant(Platform::Youtube, &d).is_empty());

        // X has no ratio restriction
        assert!(validate_variant(Platform::X, &d).is_empty());
    }

    #[test]
    fn test_media_count_rules() {
        let tags: Vec<String> = vec![];
        let mut d = draft("hi", &tags);
        d.media_count = 11;

        let issues = validate_variant(Platform::Instagram, &d);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("10"));

        // YouTube has no media count rule
        assert!(validate_variant(Platform::Youtube, &d).is_empty());
    }

    #[test]
    fn test_multiple_violations_collected() {
        let body = "a".repeat(3000);
        let tags: Vec<String> = (0..31).map(|i| format!("t{i}")).collect();
        let d = VariantDraft {
            body: &body,
            hashtags: &tags,
            media_aspect_ratio: Some("2:1"),
            media_count: 12,
        };

        let issues = validate_variant(Platform::Instagram, &d);
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_empty_hashtag_rejected() {
        let tags = vec!["  ".to_string()];
        let issues = validate_variant(Platform::X, &draft("hi", &tags));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("empty"));
    }
}
