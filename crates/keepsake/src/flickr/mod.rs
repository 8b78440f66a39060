//! Flickr support: REST client, payload normalizer and offset binding.
//!
//! Only the account's own photostream is bound; Flickr favorites are not a
//! supported feed.

mod binding;
mod client;
mod convert;

pub use binding::{
    FlickrBinding, PEOPLE_GET_INFO, PEOPLE_GET_PHOTOS, PHOTOS_GET_INFO, PHOTOS_GET_SIZES,
    TEST_LOGIN,
};
pub use client::{FLICKR_API_BASE, FlickrClient};
pub use convert::{FlickrNormalizer, buddy_icon, content, parse_taken};
