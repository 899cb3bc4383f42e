use serde::Deserialize;

/// Token pair for one download invocation. Never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub bearer_token: String,
    pub guest_token: String,
}

/// One encoded rendition of a media item. A `bitrate` of 0 marks the
/// animated-image encoding rather than a true video rendition; an absent
/// `bitrate` marks a playlist entry that is never selected.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaVariant {
    #[serde(default)]
    pub bitrate: Option<u64>,
    pub url: String,
}
