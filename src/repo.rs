use crate::client::{ApiError, ArchiveClient};
use crate::common::{Channel, Playlist, Video, WatchProgress};
use crate::config::Config;
use crate::mapper;

/// Anything that can accept watch-progress reports. The tracker only
/// needs this slice of the repository, which keeps it testable without a
/// backend.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &WatchProgress) -> Result<(), ApiError>;
}

/// The one interface the rest of the application talks to the backend
/// through. Wraps `ArchiveClient`, converting DTO sequences to domain
/// models (listing order preserved verbatim) and surfacing every failure
/// as a typed `ApiError` - nothing panics across this boundary.
#[derive(Debug, Clone)]
pub struct Repository {
    client: ArchiveClient,
}

impl Repository {
    pub fn new(cfg: &Config) -> Repository {
        Repository {
            client: ArchiveClient::new(cfg),
        }
    }

    pub fn videos(&self, page: u32, page_size: u32) -> Result<Vec<Video>, ApiError> {
        let page = self.client.list_videos(page, page_size)?;
        Ok(self.map_videos(&page.data))
    }

    pub fn video_details(&self, video_id: &str) -> Result<Video, ApiError> {
        let detail = self.client.get_video(video_id)?;
        Ok(mapper::video(&detail.data, self.client.base_url()))
    }

    pub fn search_videos(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Video>, ApiError> {
        let page = self.client.search_videos(query, page, page_size)?;
        Ok(self.map_videos(&page.data))
    }

    pub fn channels(&self, page: u32, page_size: u32) -> Result<Vec<Channel>, ApiError> {
        let page = self.client.list_channels(page, page_size)?;
        Ok(page
            .data
            .iter()
            .map(|d| mapper::channel(d, self.client.base_url()))
            .collect())
    }

    pub fn channel_details(&self, channel_id: &str) -> Result<Channel, ApiError> {
        let detail = self.client.get_channel(channel_id)?;
        Ok(mapper::channel(&detail.data, self.client.base_url()))
    }

    pub fn channel_videos(
        &self,
        channel_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Video>, ApiError> {
        let page = self.client.list_channel_videos(channel_id, page, page_size)?;
        Ok(self.map_videos(&page.data))
    }

    pub fn playlists(&self, page: u32, page_size: u32) -> Result<Vec<Playlist>, ApiError> {
        let page = self.client.list_playlists(page, page_size)?;
        Ok(page.data.iter().map(mapper::playlist).collect())
    }

    pub fn update_watch_progress(&self, video_id: &str, position: u64) -> Result<(), ApiError> {
        self.client.report_watch_progress(video_id, position)
    }

    fn map_videos(&self, dtos: &[crate::client::VideoDto]) -> Vec<Video> {
        dtos.iter()
            .map(|d| mapper::video(d, self.client.base_url()))
            .collect()
    }
}

impl ProgressSink for Repository {
    fn report(&self, progress: &WatchProgress) -> Result<(), ApiError> {
        self.update_watch_progress(&progress.video_id, progress.position)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_repo() -> Repository {
        Repository::new(&Config::new(&mockito::server_url(), "sekrit", "mpv"))
    }

    #[test]
    fn test_minimal_video_listing() -> Result<(), ApiError> {
        // Stats and player blocks absent, so every default applies
        let _m = mockito::mock("GET", "/api/video/")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".into(), "7".into()),
                mockito::Matcher::UrlEncoded("page_size".into(), "25".into()),
            ]))
            .with_body(
                r#"{"data": [{"youtube_id": "abc", "title": "T",
                    "channel": {"channel_id": "c1", "channel_name": "C"},
                    "published": "2024-01-01", "date_downloaded": 1700000000}]}"#,
            )
            .create();

        let videos = test_repo().videos(7, 25)?;
        assert_eq!(videos.len(), 1);
        let v = &videos[0];
        assert_eq!(v.id, "abc");
        assert_eq!(v.duration, 0);
        assert_eq!(v.duration_str, "0:00");
        assert!(!v.watched);
        assert_eq!(
            v.thumbnail_url,
            format!("{}/cache/videos/abc.jpg", mockito::server_url())
        );
        Ok(())
    }

    #[test]
    fn test_listing_order_preserved() -> Result<(), ApiError> {
        let _m = mockito::mock("GET", "/api/channel/UCorder/video/")
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"{"data": [
                    {"youtube_id": "v3", "title": "newest",
                     "channel": {"channel_id": "UCorder", "channel_name": "C"},
                     "published": "2024-03-01", "date_downloaded": 3},
                    {"youtube_id": "v1", "title": "oldest",
                     "channel": {"channel_id": "UCorder", "channel_name": "C"},
                     "published": "2024-01-01", "date_downloaded": 1},
                    {"youtube_id": "v2", "title": "middle",
                     "channel": {"channel_id": "UCorder", "channel_name": "C"},
                     "published": "2024-02-01", "date_downloaded": 2}
                ]}"#,
            )
            .create();

        let videos = test_repo().channel_videos("UCorder", 1, 25)?;
        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v3", "v1", "v2"]);
        Ok(())
    }

    #[test]
    fn test_detail_not_found_propagates_cause() {
        let _m = mockito::mock("GET", "/api/video/gone/")
            .with_status(404)
            .create();

        let err = test_repo().video_details("gone").unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert!(format!("{}", err).contains("404"));
    }

    #[test]
    fn test_progress_passthrough() -> Result<(), ApiError> {
        let m = mockito::mock("POST", "/api/video/v9/progress/")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "youtube_id": "v9",
                "position": 130,
            })))
            .create();

        let repo = test_repo();
        repo.update_watch_progress("v9", 130)?;

        // Same endpoint through the sink trait the tracker uses
        let progress = WatchProgress {
            video_id: "v9".into(),
            position: 130,
        };
        ProgressSink::report(&repo, &progress)?;

        m.expect(2).assert();
        Ok(())
    }
}
