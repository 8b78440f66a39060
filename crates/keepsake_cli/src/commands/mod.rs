pub(crate) mod account;
#[cfg(feature = "twitter")]
pub(crate) mod archive;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod shared;
pub(crate) mod sync;
