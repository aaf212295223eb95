//! Wire DTO to domain model conversion. Pure functions, no I/O: a DTO
//! that decoded successfully always maps, with absent optional fields
//! filled by the defaults below. An empty id is a bug in the caller and
//! panics rather than producing a half-valid model.

use crate::client::{self, ChannelDto, PlaylistDto, VideoDto};
use crate::common::{Channel, Playlist, Video};

pub fn video(dto: &VideoDto, base_url: &str) -> Video {
    assert!(!dto.youtube_id.is_empty(), "Video DTO with empty youtube_id");

    Video {
        id: dto.youtube_id.clone(),
        title: dto.title.clone(),
        channel_id: dto.channel.channel_id.clone(),
        channel_name: dto.channel.channel_name.clone(),
        // The backend's vid_thumb_url is a server-relative path, so the
        // cache URL is always derived from the id instead
        thumbnail_url: client::video_thumb_url(base_url, &dto.youtube_id),
        stream_url: client::stream_url(base_url, &dto.youtube_id),
        duration: dto.player.as_ref().map(|p| p.duration).unwrap_or(0),
        duration_str: dto
            .player
            .as_ref()
            .map(|p| p.duration_str.clone())
            .unwrap_or_else(|| "0:00".into()),
        published: dto.published.clone(),
        date_downloaded: dto.date_downloaded,
        description: dto.description.clone().unwrap_or_default(),
        tags: dto.tags.clone().unwrap_or_default(),
        view_count: dto.stats.as_ref().and_then(|s| s.view_count).unwrap_or(0),
        like_count: dto.stats.as_ref().and_then(|s| s.like_count).unwrap_or(0),
        watched: dto.player.as_ref().map(|p| p.watched).unwrap_or(false),
    }
}

pub fn channel(dto: &ChannelDto, base_url: &str) -> Channel {
    assert!(!dto.channel_id.is_empty(), "Channel DTO with empty channel_id");

    Channel {
        id: dto.channel_id.clone(),
        name: dto.channel_name.clone(),
        // Unlike videos, an explicit channel thumbnail wins over the
        // derived cache path
        thumbnail_url: dto
            .channel_thumb_url
            .clone()
            .unwrap_or_else(|| client::channel_thumb_url(base_url, &dto.channel_id)),
        banner_url: dto.channel_banner_url.clone().unwrap_or_default(),
        description: dto.channel_description.clone().unwrap_or_default(),
        subscriber_count: dto.channel_subs.unwrap_or(0),
        view_count: dto.channel_views.unwrap_or(0),
    }
}

pub fn playlist(dto: &PlaylistDto) -> Playlist {
    assert!(
        !dto.playlist_id.is_empty(),
        "Playlist DTO with empty playlist_id"
    );

    Playlist {
        id: dto.playlist_id.clone(),
        name: dto.playlist_name.clone(),
        channel_id: dto.playlist_channel_id.clone(),
        channel_name: dto.playlist_channel.clone(),
        thumbnail_url: dto.playlist_thumbnail.clone().unwrap_or_default(),
        description: dto.playlist_description.clone().unwrap_or_default(),
    }
}
