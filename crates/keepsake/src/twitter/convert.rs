//! Tweet and user payloads to canonical shapes.
//!
//! Handles both live API payloads and archive exports. Archive tweets use
//! different date formats and lack an embedded user; the importer injects
//! `{"user": {"id_str": ...}}` so the owner resolves by id.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use sea_orm::{ActiveValue, Set};
use serde_json::{Value, json};

use crate::entity::identity::ActiveModel as IdentityActiveModel;
use crate::entity::item::ActiveModel as ItemActiveModel;
use crate::entity::item_kind::ItemKind;
use crate::entity::media::ActiveModel as MediaActiveModel;
use crate::entity::media_kind::MediaKind;
use crate::entity::platform_type::PlatformType;
use crate::platform::convert::{as_i64, bool_at, f64_at, i32_at, i64_at, id_at, path, str_at};
use crate::platform::strip_null_values;
use crate::sync::{
    CanonicalIdentity, CanonicalItem, CanonicalMedia, ItemError, Normalizer, OwnerRef,
    RemoteAssociation,
};

/// API `created_at`: `Wed Aug 27 13:08:45 +0000 2008`.
const API_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";
/// Legacy archive `created_at`: `2010-01-01 12:00:00 +0000`.
const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Parse any of the date forms Twitter payloads use.
///
/// Returns `None` for anything unrecognised rather than failing the record.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, API_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_str(raw, ARCHIVE_DATE_FORMAT))
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

fn date_at(value: &Value, key: &str) -> Option<DateTime<FixedOffset>> {
    str_at(value, key).and_then(parse_date)
}

/// Strip the `<a href=...>` wrapper from a `source` field.
pub fn source_name(raw: &str) -> String {
    match (raw.find('>'), raw.rfind("</a>")) {
        (Some(start), Some(end)) if start < end => raw[start + 1..end].to_string(),
        _ => raw.to_string(),
    }
}

/// Full-size avatar URL from the `_normal` thumbnail URL.
pub fn full_size_avatar(url: &str) -> String {
    url.replacen("_normal.", ".", 1)
}

/// Set an optional column only when the payload carries the field.
fn set_some<T>(value: Option<T>) -> ActiveValue<Option<T>>
where
    T: Into<sea_orm::Value>,
    Option<T>: Into<sea_orm::Value>,
{
    match value {
        Some(v) => Set(Some(v)),
        None => ActiveValue::NotSet,
    }
}

/// Normalizer for Twitter payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwitterNormalizer;

impl TwitterNormalizer {
    fn identity(raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        let external_id =
            id_at(raw, "id_str").or_else(|| id_at(raw, "id")).ok_or_else(|| {
                ItemError::malformed("user without id")
            })?;
        let username = str_at(raw, "screen_name")
            .ok_or_else(|| ItemError::malformed(format!("user {external_id} without screen_name")))?;

        let mut fields = IdentityActiveModel {
            username: Set(username.to_string()),
            ..Default::default()
        };
        fields.display_name = set_some(str_at(raw, "name").map(str::to_string));
        fields.description = set_some(str_at(raw, "description").map(str::to_string));
        fields.location = set_some(str_at(raw, "location").map(str::to_string));
        fields.url = set_some(
            path(raw, &["entities", "url", "urls"])
                .and_then(|urls| urls.get(0))
                .and_then(|u| str_at(u, "expanded_url"))
                .or_else(|| str_at(raw, "url"))
                .map(str::to_string),
        );
        fields.avatar_url = set_some(
            str_at(raw, "profile_image_url_https")
                .or_else(|| str_at(raw, "profile_image_url"))
                .map(full_size_avatar),
        );
        if let Some(private) = bool_at(raw, "protected") {
            fields.is_private = Set(private);
        }
        if let Some(verified) = bool_at(raw, "verified") {
            fields.is_verified = Set(verified);
        }
        fields.followers_count = set_some(i32_at(raw, "followers_count"));
        fields.following_count = set_some(i32_at(raw, "friends_count"));
        fields.items_count = set_some(i32_at(raw, "statuses_count"));
        fields.post_time = set_some(date_at(raw, "created_at"));
        fields.raw = Set(Some(strip_null_values(raw.clone())));

        Ok(CanonicalIdentity {
            external_id,
            fields,
        })
    }

    fn owner(raw: &Value, external_id: &str) -> Result<OwnerRef, ItemError> {
        let user = raw
            .get("user")
            .ok_or_else(|| ItemError::malformed(format!("tweet {external_id} without user")))?;
        if str_at(user, "screen_name").is_some() {
            return Ok(OwnerRef::Inline(Self::identity(user)?));
        }
        id_at(user, "id_str")
            .or_else(|| id_at(user, "id"))
            .map(OwnerRef::ById)
            .ok_or_else(|| ItemError::malformed(format!("tweet {external_id} without user id")))
    }

    fn media(raw: &Value) -> Option<Vec<CanonicalMedia>> {
        let list = path(raw, &["extended_entities", "media"])
            .or_else(|| path(raw, &["entities", "media"]))?
            .as_array()?;
        Some(list.iter().filter_map(media_attachment).collect())
    }

    fn hashtags(raw: &Value, owner_id: &str) -> Option<Vec<RemoteAssociation>> {
        let tags = path(raw, &["entities", "hashtags"])?.as_array()?;
        Some(
            tags.iter()
                .filter_map(|tag| str_at(tag, "text"))
                .map(|text| RemoteAssociation {
                    external_id: format!("hashtag:{}", text.to_lowercase()),
                    author_external_id: owner_id.to_string(),
                    raw_value: text.to_string(),
                    is_machine_tag: false,
                })
                .collect(),
        )
    }
}

fn media_attachment(raw: &Value) -> Option<CanonicalMedia> {
    let external_id = id_at(raw, "id_str").or_else(|| id_at(raw, "id"))?;
    let media_url = str_at(raw, "media_url_https").or_else(|| str_at(raw, "media_url"))?;
    let kind = match str_at(raw, "type") {
        Some("video") => MediaKind::Video,
        Some("animated_gif") => MediaKind::AnimatedGif,
        _ => MediaKind::Photo,
    };

    let (base, format) = match media_url.rsplit_once('.') {
        Some((base, ext)) if !ext.contains('/') => (base, ext),
        _ => (media_url, "jpg"),
    };
    let url_parts = json!({ "base": base, "format": format });

    let mut variants: Vec<Value> = path(raw, &["video_info", "variants"])
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| {
                    Some(json!({
                        "url": str_at(v, "url")?,
                        "content_type": str_at(v, "content_type")?,
                        "bitrate": i64_at(v, "bitrate").unwrap_or(0),
                    }))
                })
                .collect()
        })
        .unwrap_or_default();
    variants.sort_by_key(|v| std::cmp::Reverse(v["bitrate"].as_i64().unwrap_or(0)));

    let url = match kind {
        MediaKind::Photo => format!("{base}?format={format}&name=orig"),
        MediaKind::Video | MediaKind::AnimatedGif => variants
            .iter()
            .find(|v| v["content_type"] == "video/mp4")
            .and_then(|v| v["url"].as_str())
            .unwrap_or(media_url)
            .to_string(),
    };

    let (width, height) = match path(raw, &["original_info"]) {
        Some(info) => (i32_at(info, "width"), i32_at(info, "height")),
        None => {
            let large = path(raw, &["sizes", "large"]);
            (
                large.and_then(|l| i32_at(l, "w")),
                large.and_then(|l| i32_at(l, "h")),
            )
        }
    };

    let mut fields = MediaActiveModel {
        url: Set(url),
        url_parts: Set(url_parts),
        ..Default::default()
    };
    if !variants.is_empty() {
        fields.video_variants = Set(Some(Value::Array(variants)));
    }
    fields.width = set_some(width);
    fields.height = set_some(height);
    fields.duration_ms = set_some(path(raw, &["video_info", "duration_millis"]).and_then(as_i64));
    fields.alt_text = set_some(str_at(raw, "ext_alt_text").map(str::to_string));
    fields.raw = Set(Some(strip_null_values(raw.clone())));

    Some(CanonicalMedia {
        external_id,
        kind,
        fields,
    })
}

impl Normalizer for TwitterNormalizer {
    fn platform(&self) -> PlatformType {
        PlatformType::Twitter
    }

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        Self::identity(raw)
    }

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
        let external_id = id_at(raw, "id_str")
            .or_else(|| id_at(raw, "id"))
            .ok_or_else(|| ItemError::malformed("tweet without id"))?;
        let sort_id: i64 = external_id
            .parse()
            .map_err(|_| ItemError::malformed(format!("tweet id {external_id} is not numeric")))?;

        let owner = Self::owner(raw, &external_id)?;
        let screen_name = match &owner {
            OwnerRef::Inline(identity) => match &identity.fields.username {
                ActiveValue::Set(name) => Some(name.clone()),
                _ => None,
            },
            OwnerRef::ById(_) => None,
        };

        let mut fields = ItemActiveModel {
            sort_id: Set(sort_id),
            ..Default::default()
        };
        fields.text = set_some(
            str_at(raw, "full_text")
                .or_else(|| str_at(raw, "text"))
                .map(str::to_string),
        );
        fields.permalink = Set(Some(match screen_name {
            Some(name) => format!("https://twitter.com/{name}/status/{external_id}"),
            None => format!("https://twitter.com/i/web/status/{external_id}"),
        }));
        fields.post_time = set_some(date_at(raw, "created_at"));
        fields.source = set_some(str_at(raw, "source").map(source_name));
        fields.language = set_some(str_at(raw, "lang").map(str::to_string));
        fields.in_reply_to_external_id = set_some(id_at(raw, "in_reply_to_status_id_str")
            .or_else(|| id_at(raw, "in_reply_to_status_id")));
        fields.in_reply_to_username =
            set_some(str_at(raw, "in_reply_to_screen_name").map(str::to_string));
        fields.favorite_count = set_some(i32_at(raw, "favorite_count"));
        fields.reshare_count = set_some(i32_at(raw, "retweet_count"));
        fields.comment_count = set_some(i32_at(raw, "reply_count"));

        // GeoJSON order: [longitude, latitude].
        if let Some(coords) = path(raw, &["coordinates", "coordinates"]).and_then(Value::as_array)
            && let [lon, lat] = coords.as_slice()
        {
            fields.longitude = set_some(lon.as_f64());
            fields.latitude = set_some(lat.as_f64());
        } else if let Some(geo) = raw.get("geo") {
            // Legacy archives use {"lat": .., "long": ..}.
            fields.latitude = set_some(f64_at(geo, "lat"));
            fields.longitude = set_some(f64_at(geo, "long"));
        }
        fields.place_name = set_some(
            raw.get("place")
                .and_then(|place| str_at(place, "full_name"))
                .map(str::to_string),
        );
        fields.raw = Set(Some(strip_null_values(raw.clone())));

        let quoted = raw
            .get("quoted_status")
            .filter(|q| q.is_object())
            .map(|q| self.normalize_item(q).map(Box::new))
            .transpose()?;
        let reshared = raw
            .get("retweeted_status")
            .filter(|r| r.is_object())
            .map(|r| self.normalize_item(r).map(Box::new))
            .transpose()?;

        let tags = Self::hashtags(raw, owner.external_id());

        Ok(CanonicalItem {
            external_id,
            kind: ItemKind::Tweet,
            owner,
            fields,
            media: Self::media(raw),
            tags,
            quoted,
            reshared,
        })
    }
}
