//! Size-variant URL table.
//!
//! Each platform serves a photo at a fixed set of sizes. A size is resolved
//! by looking up `(platform, size)` in [`SIZE_TABLE`] and applying the rule
//! to the media row's stored `url_parts`.
//!
//! `url_parts` layouts:
//! - Flickr: `{"id", "server", "secret", "originalsecret"?, "originalformat"?}`
//! - Twitter: `{"base", "format"}` where `base` is the media URL without extension

use serde_json::Value;

use crate::entity::platform_type::PlatformType;

const FLICKR_STATIC_HOST: &str = "https://live.staticflickr.com";

/// Named sizes a consumer can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeVariant {
    /// 75×75 crop.
    Square75,
    /// 150×150 crop.
    Square150,
    /// 100 on the longest side.
    Thumbnail,
    Small240,
    Small320,
    Medium500,
    Medium640,
    Medium800,
    Large1024,
    Large1600,
    Large2048,
    /// The file as uploaded.
    Original,
}

/// How to build the URL for one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRule {
    /// `{host}/{server}/{id}_{secret}{suffix}.jpg`; an empty suffix is the default size.
    FlickrSuffix(&'static str),
    /// `{host}/{server}/{id}_{originalsecret}_o.{originalformat}`.
    FlickrOriginal,
    /// `{base}?format={format}&name={name}`.
    TwitterName(&'static str),
}

/// Every size each platform offers. Sizes absent here resolve to `None`.
pub static SIZE_TABLE: &[(PlatformType, SizeVariant, SizeRule)] = &[
    (PlatformType::Flickr, SizeVariant::Square75, SizeRule::FlickrSuffix("_s")),
    (PlatformType::Flickr, SizeVariant::Square150, SizeRule::FlickrSuffix("_q")),
    (PlatformType::Flickr, SizeVariant::Thumbnail, SizeRule::FlickrSuffix("_t")),
    (PlatformType::Flickr, SizeVariant::Small240, SizeRule::FlickrSuffix("_m")),
    (PlatformType::Flickr, SizeVariant::Small320, SizeRule::FlickrSuffix("_n")),
    (PlatformType::Flickr, SizeVariant::Medium500, SizeRule::FlickrSuffix("")),
    (PlatformType::Flickr, SizeVariant::Medium640, SizeRule::FlickrSuffix("_z")),
    (PlatformType::Flickr, SizeVariant::Medium800, SizeRule::FlickrSuffix("_c")),
    (PlatformType::Flickr, SizeVariant::Large1024, SizeRule::FlickrSuffix("_b")),
    (PlatformType::Flickr, SizeVariant::Large1600, SizeRule::FlickrSuffix("_h")),
    (PlatformType::Flickr, SizeVariant::Large2048, SizeRule::FlickrSuffix("_k")),
    (PlatformType::Flickr, SizeVariant::Original, SizeRule::FlickrOriginal),
    (PlatformType::Twitter, SizeVariant::Square150, SizeRule::TwitterName("thumb")),
    (PlatformType::Twitter, SizeVariant::Thumbnail, SizeRule::TwitterName("thumb")),
    (PlatformType::Twitter, SizeVariant::Small320, SizeRule::TwitterName("small")),
    (PlatformType::Twitter, SizeVariant::Medium800, SizeRule::TwitterName("medium")),
    (PlatformType::Twitter, SizeVariant::Large2048, SizeRule::TwitterName("large")),
    (PlatformType::Twitter, SizeVariant::Original, SizeRule::TwitterName("orig")),
];

/// Look up the rule for a size on a platform.
pub fn rule_for(platform: PlatformType, size: SizeVariant) -> Option<SizeRule> {
    SIZE_TABLE
        .iter()
        .find(|(p, s, _)| *p == platform && *s == size)
        .map(|(_, _, rule)| *rule)
}

/// Build the URL for `size` from stored `url_parts`.
///
/// Returns `None` when the platform has no such size or the parts it needs
/// are missing.
pub fn variant_url(platform: PlatformType, url_parts: &Value, size: SizeVariant) -> Option<String> {
    let part = |key: &str| -> Option<String> {
        match url_parts.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    match rule_for(platform, size)? {
        SizeRule::FlickrSuffix(suffix) => Some(format!(
            "{FLICKR_STATIC_HOST}/{}/{}_{}{suffix}.jpg",
            part("server")?,
            part("id")?,
            part("secret")?
        )),
        SizeRule::FlickrOriginal => Some(format!(
            "{FLICKR_STATIC_HOST}/{}/{}_{}_o.{}",
            part("server")?,
            part("id")?,
            part("originalsecret")?,
            part("originalformat").unwrap_or_else(|| "jpg".to_string())
        )),
        SizeRule::TwitterName(name) => Some(format!(
            "{}?format={}&name={name}",
            part("base")?,
            part("format").unwrap_or_else(|| "jpg".to_string())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flickr_parts() -> Value {
        json!({
            "id": "5033125563",
            "server": 4089,
            "secret": "a1b2c3",
            "originalsecret": "ffee00",
            "originalformat": "png"
        })
    }

    #[test]
    fn flickr_suffixes() {
        let parts = flickr_parts();
        assert_eq!(
            variant_url(PlatformType::Flickr, &parts, SizeVariant::Square75).as_deref(),
            Some("https://live.staticflickr.com/4089/5033125563_a1b2c3_s.jpg")
        );
        assert_eq!(
            variant_url(PlatformType::Flickr, &parts, SizeVariant::Medium500).as_deref(),
            Some("https://live.staticflickr.com/4089/5033125563_a1b2c3.jpg")
        );
        assert_eq!(
            variant_url(PlatformType::Flickr, &parts, SizeVariant::Large1024).as_deref(),
            Some("https://live.staticflickr.com/4089/5033125563_a1b2c3_b.jpg")
        );
    }

    #[test]
    fn flickr_original_uses_original_secret_and_format() {
        assert_eq!(
            variant_url(PlatformType::Flickr, &flickr_parts(), SizeVariant::Original).as_deref(),
            Some("https://live.staticflickr.com/4089/5033125563_ffee00_o.png")
        );

        let no_original = json!({"id": "1", "server": "2", "secret": "s"});
        assert_eq!(
            variant_url(PlatformType::Flickr, &no_original, SizeVariant::Original),
            None
        );
    }

    #[test]
    fn twitter_names() {
        let parts = json!({"base": "https://pbs.twimg.com/media/ABC", "format": "png"});
        assert_eq!(
            variant_url(PlatformType::Twitter, &parts, SizeVariant::Original).as_deref(),
            Some("https://pbs.twimg.com/media/ABC?format=png&name=orig")
        );
        assert_eq!(
            variant_url(PlatformType::Twitter, &parts, SizeVariant::Thumbnail).as_deref(),
            Some("https://pbs.twimg.com/media/ABC?format=png&name=thumb")
        );
    }

    #[test]
    fn sizes_a_platform_lacks_resolve_to_none() {
        let parts = json!({"base": "https://pbs.twimg.com/media/ABC", "format": "jpg"});
        assert_eq!(
            variant_url(PlatformType::Twitter, &parts, SizeVariant::Square75),
            None
        );
        assert_eq!(rule_for(PlatformType::Twitter, SizeVariant::Medium640), None);
    }

    #[test]
    fn table_has_no_duplicate_entries() {
        for (i, (p, s, _)) in SIZE_TABLE.iter().enumerate() {
            assert!(
                !SIZE_TABLE[i + 1..]
                    .iter()
                    .any(|(p2, s2, _)| p2 == p && s2 == s),
                "duplicate entry for {p:?} {s:?}"
            );
        }
    }
}
