//! Flickr photo and person payloads to canonical shapes.
//!
//! Flickr wraps most strings as `{"_content": "..."}` and sends numbers as
//! strings. Photos arrive either as a `flickr.photos.getInfo` object
//! (optionally with a `sizes` list attached for videos) or as a bare
//! `flickr.people.getPhotos` list entry when enrichment was not possible.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use sea_orm::{ActiveValue, Set};
use serde_json::{Map, Value};

use crate::entity::identity::ActiveModel as IdentityActiveModel;
use crate::entity::item::ActiveModel as ItemActiveModel;
use crate::entity::item_kind::ItemKind;
use crate::entity::media::ActiveModel as MediaActiveModel;
use crate::entity::media_kind::MediaKind;
use crate::entity::platform_type::PlatformType;
use crate::media::SizeVariant;
use crate::media::sizes::variant_url;
use crate::platform::convert::{as_i64, bool_at, f64_at, i32_at, i64_at, id_at, path, str_at};
use crate::platform::strip_null_values;
use crate::sync::{
    CanonicalIdentity, CanonicalItem, CanonicalMedia, ItemError, Normalizer, OwnerRef,
    RemoteAssociation,
};

/// `dates.taken` / `datetaken`: `2010-05-01 14:03:22`, in the camera's local time.
const TAKEN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A string field, plain or `{"_content": ...}`-wrapped.
pub fn content<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value.get(key)? {
        Value::String(s) => Some(s.as_str()),
        wrapped => wrapped.get("_content").and_then(Value::as_str),
    }
    .filter(|s| !s.is_empty())
}

fn unix_time(value: &Value) -> Option<DateTime<FixedOffset>> {
    as_i64(value)
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|t| t.fixed_offset())
}

/// Parse a taken date. Flickr reports these without an offset; they are stored as UTC.
pub fn parse_taken(raw: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw.trim(), TAKEN_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Buddy icon URL, or `None` for accounts using the default icon.
pub fn buddy_icon(nsid: &str, iconfarm: Option<i64>, iconserver: Option<i64>) -> Option<String> {
    match (iconfarm, iconserver) {
        (Some(farm), Some(server)) if server > 0 => Some(format!(
            "https://farm{farm}.staticflickr.com/{server}/buddyicons/{nsid}.jpg"
        )),
        _ => None,
    }
}

fn set_some<T>(value: Option<T>) -> ActiveValue<Option<T>>
where
    T: Into<sea_orm::Value>,
    Option<T>: Into<sea_orm::Value>,
{
    value.map_or(ActiveValue::NotSet, |v| Set(Some(v)))
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Unwrap `{"person": ...}` / `{"photo": ...}` response envelopes.
fn unwrap_envelope<'a>(raw: &'a Value, key: &str) -> &'a Value {
    raw.get(key).filter(|v| v.is_object()).unwrap_or(raw)
}

/// Normalizer for Flickr payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlickrNormalizer;

impl FlickrNormalizer {
    fn owner_id(photo: &Value) -> Option<String> {
        match photo.get("owner")? {
            Value::String(nsid) if !nsid.is_empty() => Some(nsid.clone()),
            owner => str_at(owner, "nsid").map(str::to_string),
        }
    }

    fn media(photo: &Value, external_id: &str) -> CanonicalMedia {
        let kind = match str_at(photo, "media") {
            Some("video") => MediaKind::Video,
            _ => MediaKind::Photo,
        };

        let mut parts = Map::new();
        parts.insert("id".into(), Value::String(external_id.to_string()));
        for key in ["server", "secret", "originalsecret", "originalformat"] {
            if let Some(value) = id_at(photo, key) {
                parts.insert(key.into(), Value::String(value));
            }
        }
        let url_parts = Value::Object(parts);

        let mut fields = MediaActiveModel::default();

        let still = variant_url(PlatformType::Flickr, &url_parts, SizeVariant::Original)
            .or_else(|| variant_url(PlatformType::Flickr, &url_parts, SizeVariant::Large1024))
            .unwrap_or_default();

        let mut renditions: Vec<&Value> = path(photo, &["sizes", "size"])
            .and_then(Value::as_array)
            .map(|sizes| {
                sizes
                    .iter()
                    .filter(|s| str_at(s, "media") == Some("video") && str_at(s, "source").is_some())
                    .collect()
            })
            .unwrap_or_default();
        renditions.sort_by_key(|s| std::cmp::Reverse(i64_at(s, "width").unwrap_or(0)));

        if !renditions.is_empty() {
            let variants: Vec<Value> = renditions
                .iter()
                .map(|s| {
                    let width = i64_at(s, "width").unwrap_or(0);
                    let height = i64_at(s, "height").unwrap_or(0);
                    serde_json::json!({
                        "url": str_at(s, "source"),
                        "label": str_at(s, "label"),
                        "content_type": "video/mp4",
                        // No bitrates are reported; pixel count orders the renditions.
                        "bitrate": width * height,
                    })
                })
                .collect();
            fields.video_variants = Set(Some(Value::Array(variants)));
        }

        let url = match kind {
            MediaKind::Video => renditions
                .first()
                .and_then(|s| str_at(s, "source"))
                .map_or(still, str::to_string),
            _ => still,
        };

        let (width, height) = match (photo.get("video"), renditions.first()) {
            (Some(video), _) if i32_at(video, "width").is_some() => {
                (i32_at(video, "width"), i32_at(video, "height"))
            }
            (_, Some(best)) => (i32_at(best, "width"), i32_at(best, "height")),
            _ => (i32_at(photo, "o_width"), i32_at(photo, "o_height")),
        };

        fields.url = Set(url);
        fields.url_parts = Set(url_parts);
        fields.width = set_some(width);
        fields.height = set_some(height);
        fields.duration_ms = set_some(
            photo
                .get("video")
                .and_then(|v| i64_at(v, "duration"))
                .map(|secs| secs * 1000),
        );

        CanonicalMedia {
            external_id: external_id.to_string(),
            kind,
            fields,
        }
    }

    fn tags(photo: &Value) -> Option<Vec<RemoteAssociation>> {
        let tags = path(photo, &["tags", "tag"])?.as_array()?;
        Some(
            tags.iter()
                .filter_map(|tag| {
                    Some(RemoteAssociation {
                        external_id: id_at(tag, "id")?,
                        author_external_id: str_at(tag, "author")?.to_string(),
                        raw_value: str_at(tag, "raw")
                            .or_else(|| str_at(tag, "_content"))?
                            .to_string(),
                        is_machine_tag: bool_at(tag, "machine_tag").unwrap_or(false),
                    })
                })
                .collect(),
        )
    }

    fn place_name(photo: &Value) -> Option<String> {
        let location = photo.get("location")?;
        let parts: Vec<&str> = ["locality", "region", "country"]
            .iter()
            .filter_map(|key| content(location, key))
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl Normalizer for FlickrNormalizer {
    fn platform(&self) -> PlatformType {
        PlatformType::Flickr
    }

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        let person = unwrap_envelope(raw, "person");
        let external_id = str_at(person, "nsid")
            .or_else(|| str_at(person, "id"))
            .ok_or_else(|| ItemError::malformed("person without nsid"))?
            .to_string();
        let username = content(person, "username")
            .ok_or_else(|| ItemError::malformed(format!("person {external_id} without username")))?;

        let mut fields = IdentityActiveModel {
            username: Set(username.to_string()),
            ..Default::default()
        };
        fields.display_name = set_some(owned(content(person, "realname")));
        fields.description = set_some(owned(content(person, "description")));
        fields.location = set_some(owned(content(person, "location")));
        fields.url = set_some(owned(
            content(person, "profileurl").or_else(|| content(person, "photosurl")),
        ));
        fields.avatar_url = set_some(buddy_icon(
            &external_id,
            i64_at(person, "iconfarm"),
            i64_at(person, "iconserver"),
        ));
        if let Some(pro) = bool_at(person, "ispro") {
            fields.is_verified = Set(pro);
        }
        let photos = person.get("photos");
        fields.items_count = set_some(
            photos
                .and_then(|p| content(p, "count"))
                .and_then(|c| c.parse().ok()),
        );
        fields.post_time = set_some(
            photos
                .and_then(|p| content(p, "firstdate"))
                .and_then(|d| unix_time(&Value::String(d.to_string()))),
        );
        fields.raw = Set(Some(strip_null_values(raw.clone())));

        Ok(CanonicalIdentity {
            external_id,
            fields,
        })
    }

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
        let photo = unwrap_envelope(raw, "photo");
        let external_id =
            id_at(photo, "id").ok_or_else(|| ItemError::malformed("photo without id"))?;
        let sort_id: i64 = external_id
            .parse()
            .map_err(|_| ItemError::malformed(format!("photo id {external_id} is not numeric")))?;
        let owner_id = Self::owner_id(photo)
            .ok_or_else(|| ItemError::malformed(format!("photo {external_id} without owner")))?;

        let mut fields = ItemActiveModel {
            sort_id: Set(sort_id),
            ..Default::default()
        };
        fields.title = set_some(owned(content(photo, "title")));
        fields.text = set_some(owned(content(photo, "description")));
        fields.media_type = set_some(owned(str_at(photo, "media")));
        fields.permalink = Set(Some(
            path(photo, &["urls", "url"])
                .and_then(Value::as_array)
                .and_then(|urls| urls.iter().find(|u| str_at(u, "type") == Some("photopage")))
                .and_then(|u| str_at(u, "_content"))
                .map_or_else(
                    || format!("https://www.flickr.com/photos/{owner_id}/{external_id}/"),
                    str::to_string,
                ),
        ));

        let dates = photo.get("dates");
        fields.post_time = set_some(
            dates
                .and_then(|d| d.get("posted"))
                .or_else(|| photo.get("dateupload"))
                .or_else(|| photo.get("dateuploaded"))
                .and_then(unix_time),
        );
        fields.taken_time = set_some(
            dates
                .and_then(|d| str_at(d, "taken"))
                .or_else(|| str_at(photo, "datetaken"))
                .and_then(parse_taken),
        );

        if let Some(location) = photo.get("location") {
            fields.latitude = set_some(f64_at(location, "latitude"));
            fields.longitude = set_some(f64_at(location, "longitude"));
        }
        fields.place_name = set_some(Self::place_name(photo));
        fields.view_count = set_some(i32_at(photo, "views"));
        fields.comment_count = set_some(
            content(photo, "comments").and_then(|c| c.parse().ok()),
        );
        fields.favorite_count = set_some(i32_at(photo, "count_faves"));
        fields.raw = Set(Some(strip_null_values(raw.clone())));

        // Bare list entries carry no secret; without one no media URL can be built.
        let media = id_at(photo, "secret").map(|_| vec![Self::media(photo, &external_id)]);

        Ok(CanonicalItem {
            external_id,
            kind: ItemKind::Photo,
            owner: OwnerRef::ById(owner_id),
            fields,
            media,
            tags: Self::tags(photo),
            quoted: None,
            reshared: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn photo_info() -> Value {
        json!({"photo": {
            "id": "5033125563",
            "secret": "a1b2c3",
            "server": "4089",
            "farm": 5,
            "originalsecret": "ffee00",
            "originalformat": "png",
            "media": "photo",
            "views": "42",
            "owner": {"nsid": "35034348999@N01", "username": "bees"},
            "title": {"_content": "Hive"},
            "description": {"_content": ""},
            "dates": {"posted": "1286000000", "taken": "2010-10-01 12:30:00"},
            "comments": {"_content": "3"},
            "location": {
                "latitude": "51.5", "longitude": "-0.12",
                "locality": {"_content": "London"},
                "country": {"_content": "United Kingdom"}
            },
            "tags": {"tag": [
                {"id": "1-5033125563-1", "author": "35034348999@N01", "raw": "Honey Bee", "_content": "honeybee", "machine_tag": 0},
                {"id": "1-5033125563-2", "author": "12037949754@N01", "raw": "geo:lat=51.5", "_content": "geo:lat=515", "machine_tag": 1}
            ]},
            "urls": {"url": [{"type": "photopage", "_content": "https://www.flickr.com/photos/bees/5033125563/"}]}
        }, "stat": "ok"})
    }

    #[test]
    fn content_reads_plain_and_wrapped() {
        let v = json!({"a": "x", "b": {"_content": "y"}, "c": {"_content": ""}});
        assert_eq!(content(&v, "a"), Some("x"));
        assert_eq!(content(&v, "b"), Some("y"));
        assert_eq!(content(&v, "c"), None);
    }

    #[test]
    fn normalizes_photo() {
        let item = FlickrNormalizer.normalize_item(&photo_info()).unwrap();
        assert_eq!(item.external_id, "5033125563");
        assert_eq!(item.kind, ItemKind::Photo);
        assert!(matches!(item.owner, OwnerRef::ById(ref id) if id == "35034348999@N01"));
        assert_eq!(item.fields.title, Set(Some("Hive".to_string())));
        assert!(item.fields.text.is_not_set());
        assert_eq!(item.fields.view_count, Set(Some(42)));
        assert_eq!(item.fields.comment_count, Set(Some(3)));
        assert_eq!(item.fields.latitude, Set(Some(51.5)));
        assert_eq!(
            item.fields.place_name,
            Set(Some("London, United Kingdom".to_string()))
        );
        assert_eq!(
            item.fields.taken_time,
            Set(parse_taken("2010-10-01 12:30:00"))
        );
        assert_eq!(
            item.fields.post_time,
            Set(DateTime::from_timestamp(1_286_000_000, 0).map(|t| t.fixed_offset()))
        );
    }

    #[test]
    fn photo_media_points_at_original() {
        let item = FlickrNormalizer.normalize_item(&photo_info()).unwrap();
        let media = item.media.unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].external_id, "5033125563");
        assert_eq!(media[0].kind, MediaKind::Photo);
        assert_eq!(
            media[0].fields.url,
            Set("https://live.staticflickr.com/4089/5033125563_ffee00_o.png".to_string())
        );
    }

    #[test]
    fn tags_keep_author_and_machine_flag() {
        let item = FlickrNormalizer.normalize_item(&photo_info()).unwrap();
        let tags = item.tags.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].raw_value, "Honey Bee");
        assert!(!tags[0].is_machine_tag);
        assert_eq!(tags[1].author_external_id, "12037949754@N01");
        assert!(tags[1].is_machine_tag);
    }

    #[test]
    fn video_uses_largest_rendition() {
        let mut raw = photo_info();
        raw["photo"]["media"] = json!("video");
        raw["photo"]["video"] = json!({"duration": "12", "width": "1280", "height": "720"});
        raw["photo"]["sizes"] = json!({"size": [
            {"label": "Site MP4", "width": "640", "height": "360", "source": "https://v/site.mp4", "media": "video"},
            {"label": "Large", "width": "1024", "height": "576", "source": "https://p/large.jpg", "media": "photo"},
            {"label": "HD MP4", "width": "1280", "height": "720", "source": "https://v/hd.mp4", "media": "video"}
        ]});

        let media = FlickrNormalizer.normalize_item(&raw).unwrap().media.unwrap();
        assert_eq!(media[0].kind, MediaKind::Video);
        assert_eq!(media[0].fields.url, Set("https://v/hd.mp4".to_string()));
        assert_eq!(media[0].fields.duration_ms, Set(Some(12_000)));
        assert_eq!(media[0].fields.width, Set(Some(1280)));
    }

    #[test]
    fn bare_list_entry_leaves_media_and_tags_untouched() {
        let raw = json!({"id": "77", "owner": "1@N01", "title": "x", "dateupload": "1286000000"});
        let item = FlickrNormalizer.normalize_item(&raw).unwrap();
        assert!(matches!(item.owner, OwnerRef::ById(ref id) if id == "1@N01"));
        assert!(item.media.is_none());
        assert!(item.tags.is_none());
        assert!(item.fields.post_time.is_set());
    }

    #[test]
    fn normalizes_person() {
        let raw = json!({"person": {
            "id": "35034348999@N01",
            "nsid": "35034348999@N01",
            "ispro": 1,
            "iconserver": "5",
            "iconfarm": 1,
            "username": {"_content": "bees"},
            "realname": {"_content": "Bee Keeper"},
            "location": {"_content": ""},
            "photos": {"count": {"_content": "120"}, "firstdate": {"_content": "1100000000"}}
        }, "stat": "ok"});

        let identity = FlickrNormalizer.normalize_identity(&raw).unwrap();
        assert_eq!(identity.external_id, "35034348999@N01");
        assert_eq!(identity.fields.username, Set("bees".to_string()));
        assert_eq!(identity.fields.display_name, Set(Some("Bee Keeper".to_string())));
        assert!(identity.fields.location.is_not_set());
        assert_eq!(identity.fields.items_count, Set(Some(120)));
        assert_eq!(identity.fields.is_verified, Set(true));
        assert_eq!(
            identity.avatar_url(),
            Some("https://farm1.staticflickr.com/5/buddyicons/35034348999@N01.jpg")
        );
    }

    #[test]
    fn default_buddy_icon_is_none() {
        assert_eq!(buddy_icon("1@N01", Some(0), Some(0)), None);
        assert_eq!(buddy_icon("1@N01", None, None), None);
    }

    #[test]
    fn malformed_records() {
        assert!(matches!(
            FlickrNormalizer.normalize_item(&json!({"title": "no id"})),
            Err(ItemError::Malformed { .. })
        ));
        assert!(matches!(
            FlickrNormalizer.normalize_item(&json!({"id": "1"})),
            Err(ItemError::Malformed { .. })
        ));
        assert!(matches!(
            FlickrNormalizer.normalize_identity(&json!({"person": {"nsid": "1@N01"}})),
            Err(ItemError::Malformed { .. })
        ));
    }
}
