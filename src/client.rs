use std::time::Duration;

use log::{debug, trace};
use thiserror::Error;

use crate::config::Config;

/// All timeouts (connect/read/total) applied to every request. A stalled
/// backend surfaces as `ApiError::Transport`, never a hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/*
Response envelope, shared by every endpoint:

{
  "data": [ ... ] | { ... },
  "paginate": {
    "page_size": 25,
    "page_from": 0,
    "current_page": 1,
    "last_page": 4,
    "total_hits": 87,
    "max_hits": false,
    "params": "..."
  }
}

Video object:

{
  "youtube_id": String,
  "title": String,
  "channel": { "channel_id": String, "channel_name": String, ... },
  "published": "2024-01-01",
  "date_downloaded": 1700000000,      // epoch millis
  "vid_thumb_url": String?,           // relative path, unused (see mapper)
  "description": String?,
  "tags": [String]?,
  "player": { "watched": Bool, "duration": Int, "duration_str": String }?,
  "stats": { "view_count": Int?, "like_count": Int?, ... }?
}
*/

/// Paginated listing envelope. The `data` order is the listing order the
/// backend chose and is preserved all the way to the domain layer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub paginate: Option<PaginationDto>,
}

/// Single-object envelope used by the detail endpoints
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Detail<T> {
    pub data: T,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaginationDto {
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub last_page: u32,
    pub total_hits: Option<u64>,
    /// True when the result set was truncated by the search backend
    #[serde(default)]
    pub max_hits: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VideoDto {
    pub youtube_id: String,
    pub title: String,
    pub channel: ChannelSummaryDto,
    pub published: String,
    pub date_downloaded: i64,
    pub vid_thumb_url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub player: Option<PlayerDto>,
    pub stats: Option<StatsDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChannelSummaryDto {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_thumb_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlayerDto {
    #[serde(default)]
    pub watched: bool,
    pub duration: u32,
    pub duration_str: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StatsDto {
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChannelDto {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_banner_url: Option<String>,
    pub channel_thumb_url: Option<String>,
    pub channel_description: Option<String>,
    pub channel_subs: Option<u64>,
    pub channel_views: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlaylistDto {
    pub playlist_id: String,
    pub playlist_name: String,
    pub playlist_channel: String,
    pub playlist_channel_id: String,
    pub playlist_thumbnail: Option<String>,
    pub playlist_description: Option<String>,
}

/// POST body for the progress endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
struct WatchProgressBody {
    youtube_id: String,
    position: u64,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: attohttpc::Error,
    },

    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Not found (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("Failed to parse response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Stream URL for a video, served straight from the archive's media store
pub fn stream_url(base_url: &str, video_id: &str) -> String {
    format!("{}/media/videos/{}.mp4", base_url, video_id)
}

/// Cached thumbnail for a video
pub fn video_thumb_url(base_url: &str, video_id: &str) -> String {
    format!("{}/cache/videos/{}.jpg", base_url, video_id)
}

/// Cached thumbnail for a channel
pub fn channel_thumb_url(base_url: &str, channel_id: &str) -> String {
    format!("{}/cache/channels/{}.jpg", base_url, channel_id)
}

/// Client for the TubeArchivist REST API. Holds the server address and
/// API token; both are read-only after construction so the client can be
/// shared freely. Never retries - callers decide what a failure means.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    base_url: String,
    token: String,
}

impl ArchiveClient {
    pub fn new(cfg: &Config) -> ArchiveClient {
        ArchiveClient {
            base_url: cfg.base_url().into(),
            token: cfg.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_videos(&self, page: u32, page_size: u32) -> Result<Page<VideoDto>, ApiError> {
        self.get_json("/api/video/", &paging(page, page_size))
    }

    pub fn get_video(&self, video_id: &str) -> Result<Detail<VideoDto>, ApiError> {
        self.get_json(&format!("/api/video/{}/", video_id), &[])
    }

    pub fn search_videos(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<VideoDto>, ApiError> {
        let mut params = vec![("search", query.to_string())];
        params.extend(paging(page, page_size));
        self.get_json("/api/video/", &params)
    }

    pub fn list_channels(&self, page: u32, page_size: u32) -> Result<Page<ChannelDto>, ApiError> {
        self.get_json("/api/channel/", &paging(page, page_size))
    }

    pub fn get_channel(&self, channel_id: &str) -> Result<Detail<ChannelDto>, ApiError> {
        self.get_json(&format!("/api/channel/{}/", channel_id), &[])
    }

    pub fn list_channel_videos(
        &self,
        channel_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<VideoDto>, ApiError> {
        self.get_json(
            &format!("/api/channel/{}/video/", channel_id),
            &paging(page, page_size),
        )
    }

    pub fn list_playlists(&self, page: u32, page_size: u32) -> Result<Page<PlaylistDto>, ApiError> {
        self.get_json("/api/playlist/", &paging(page, page_size))
    }

    /// Tell the backend how far into a video playback has got. Side
    /// effect only, the response body is discarded.
    pub fn report_watch_progress(&self, video_id: &str, position: u64) -> Result<(), ApiError> {
        let url = format!("{}/api/video/{}/progress/", self.base_url, video_id);
        let body = WatchProgressBody {
            youtube_id: video_id.into(),
            position,
        };
        let encoded = serde_json::to_string(&body).map_err(|e| ApiError::Decode {
            url: url.clone(),
            source: e,
        })?;

        debug!("POST {} {}", &url, &encoded);
        let resp = attohttpc::post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/json")
            .connect_timeout(REQUEST_TIMEOUT)
            .read_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .text(encoded)
            .send()
            .map_err(|e| ApiError::Transport {
                url: url.clone(),
                source: e,
            })?;
        check_status(&url, resp.status().as_u16())
    }

    pub fn stream_url(&self, video_id: &str) -> String {
        stream_url(&self.base_url, video_id)
    }

    pub fn video_thumb_url(&self, video_id: &str) -> String {
        video_thumb_url(&self.base_url, video_id)
    }

    pub fn channel_thumb_url(&self, channel_id: &str) -> String {
        channel_thumb_url(&self.base_url, channel_id)
    }

    fn get_json<T: serde::de::DeserializeOwned + std::fmt::Debug>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Retrieving URL {}", &url);

        let mut req = attohttpc::get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .connect_timeout(REQUEST_TIMEOUT)
            .read_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);
        for (key, value) in query {
            req = req.param(*key, value);
        }

        let resp = req.send().map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;
        check_status(&url, resp.status().as_u16())?;

        let text = resp.text().map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;
        trace!("Raw response: {}", &text);
        let data: T = serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            url: url.clone(),
            source: e,
        })?;
        trace!("Raw deserialisation: {:?}", &data);
        Ok(data)
    }
}

fn check_status(url: &str, status: u16) -> Result<(), ApiError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(ApiError::NotFound { url: url.into() }),
        _ => Err(ApiError::Status {
            url: url.into(),
            status,
        }),
    }
}

fn paging(page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::Matcher;

    fn test_client() -> ArchiveClient {
        ArchiveClient::new(&Config::new(&mockito::server_url(), "sekrit", "mpv"))
    }

    #[test]
    fn test_list_videos() -> Result<(), ApiError> {
        let m = mockito::mock("GET", "/api/video/")
            .match_header("authorization", "Token sekrit")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("page_size".into(), "25".into()),
            ]))
            .with_body_from_file("testdata/videos_page1.json")
            .create();

        let page = test_client().list_videos(1, 25)?;
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.data[0].youtube_id, "dQw4w9WgXcQ");
        assert_eq!(page.data[0].channel.channel_name, "Rick Astley");
        assert_eq!(page.data[0].player.as_ref().unwrap().duration, 212);
        let paginate = page.paginate.unwrap();
        assert_eq!(paginate.current_page, 1);
        assert_eq!(paginate.last_page, 4);
        assert_eq!(paginate.total_hits, Some(87));

        m.expect(1).assert();
        Ok(())
    }

    #[test]
    fn test_search_sends_query() -> Result<(), ApiError> {
        let m = mockito::mock("GET", "/api/video/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "rust tutorial".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("page_size".into(), "10".into()),
            ]))
            .with_body(r#"{"data": []}"#)
            .create();

        let page = test_client().search_videos("rust tutorial", 2, 10)?;
        assert!(page.data.is_empty());
        assert!(page.paginate.is_none());

        m.expect(1).assert();
        Ok(())
    }

    #[test]
    fn test_get_video_not_found() {
        let _m = mockito::mock("GET", "/api/video/missing/")
            .with_status(404)
            .create();

        let err = test_client().get_video("missing").unwrap_err();
        match &err {
            ApiError::NotFound { url } => assert!(url.ends_with("/api/video/missing/")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(format!("{}", err).contains("404"));
    }

    #[test]
    fn test_server_error_carries_status() {
        let _m = mockito::mock("GET", "/api/channel/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create();

        let err = test_client()
            .list_channels(1, 25)
            .unwrap_err();
        match &err {
            ApiError::Status { status, .. } => assert_eq!(*status, 500),
            other => panic!("Expected Status, got {:?}", other),
        }
        assert!(format!("{}", err).contains("500"));
    }

    #[test]
    fn test_garbage_response_is_decode_error() {
        let _m = mockito::mock("GET", "/api/playlist/")
            .match_query(Matcher::Any)
            .with_body("garbagenonsense")
            .create();

        let err = test_client()
            .list_playlists(1, 25)
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn test_unknown_fields_tolerated() -> Result<(), ApiError> {
        // Newer backends add fields this client has never heard of
        let _m = mockito::mock("GET", "/api/channel/UC123/")
            .with_body(
                r#"{"data": {"channel_id": "UC123", "channel_name": "C",
                    "channel_active": true, "channel_last_refresh": "2024-05-01",
                    "some_future_field": {"nested": [1, 2, 3]}}}"#,
            )
            .create();

        let detail = test_client().get_channel("UC123")?;
        assert_eq!(detail.data.channel_id, "UC123");
        assert_eq!(detail.data.channel_subs, None);
        Ok(())
    }

    #[test]
    fn test_report_watch_progress() -> Result<(), ApiError> {
        let m = mockito::mock("POST", "/api/video/abc/progress/")
            .match_header("authorization", "Token sekrit")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "youtube_id": "abc",
                "position": 42,
            })))
            .with_status(200)
            .create();

        test_client().report_watch_progress("abc", 42)?;
        m.expect(1).assert();
        Ok(())
    }

    #[test]
    fn test_report_watch_progress_failure() {
        let _m = mockito::mock("POST", "/api/video/xyz/progress/")
            .with_status(500)
            .create();

        let err = test_client().report_watch_progress("xyz", 42).unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn test_derived_urls() {
        let c = ArchiveClient::new(&Config::new("https://ta.example.com", "t", "mpv"));
        assert_eq!(
            c.stream_url("abc"),
            "https://ta.example.com/media/videos/abc.mp4"
        );
        assert_eq!(
            c.video_thumb_url("abc"),
            "https://ta.example.com/cache/videos/abc.jpg"
        );
        assert_eq!(
            c.channel_thumb_url("UC123"),
            "https://ta.example.com/cache/channels/UC123.jpg"
        );

        // Pure in (base, id): same inputs, same string; only the id
        // segment moves
        assert_eq!(c.stream_url("abc"), c.stream_url("abc"));
        assert_eq!(
            c.stream_url("xyz"),
            "https://ta.example.com/media/videos/xyz.mp4"
        );
    }
}
