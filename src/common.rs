//! Domain types produced by `crate::mapper` from the wire DTOs in
//! `crate::client`. Nothing in the crate mutates these after
//! construction; refreshed data replaces the whole value.

/// A video held by the archive
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    /// YouTube video ID, primary key across all API calls
    pub id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    pub stream_url: String,
    /// Length in seconds
    pub duration: u32,
    /// Length as shown to the user, e.g "12:34"
    pub duration_str: String,
    /// Publish date as the backend sent it (e.g "2024-01-01")
    pub published: String,
    /// When the archive grabbed the video, epoch milliseconds
    pub date_downloaded: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub watched: bool,
}

/// A channel the archive subscribes to
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub thumbnail_url: String,
    pub banner_url: String,
    pub description: String,
    pub subscriber_count: u64,
    pub view_count: u64,
}

/// A playlist mirrored from YouTube
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    pub description: String,
}

/// Playback position for a video, as reported to the backend. Transient,
/// the backend owns persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchProgress {
    pub video_id: String,
    /// Whole seconds from the start of the video
    pub position: u64,
}
