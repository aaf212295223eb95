use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Connection settings for the TubeArchivist backend. The server address
/// and API token are always supplied by the user (environment or config
/// file), never baked into the binary.
#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    pub token: String,
    /// Command used by `taview watch`
    pub player_cmd: String,
}

#[derive(Deserialize, Debug)]
struct ConfigFile {
    server_url: String,
    api_token: String,
    player_cmd: Option<String>,
}

const DEFAULT_PLAYER: &str = "mpv";

impl Config {
    /// Load settings, preferring `TAVIEW_URL`/`TAVIEW_TOKEN` environment
    /// variables over the `taview.json` config file.
    pub fn load() -> Result<Config> {
        let env_url = std::env::var("TAVIEW_URL").ok();
        let env_token = std::env::var("TAVIEW_TOKEN").ok();

        if let (Some(url), Some(token)) = (&env_url, &env_token) {
            return Ok(Config::new(url, token, DEFAULT_PLAYER));
        }

        let path = Config::config_filepath()?;
        let raw = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "No config file at {:?} - create it or set TAVIEW_URL and TAVIEW_TOKEN",
                &path
            )
        })?;
        let parsed: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {:?}", &path))?;

        // Env vars still override individual file entries
        Ok(Config::new(
            &env_url.unwrap_or(parsed.server_url),
            &env_token.unwrap_or(parsed.api_token),
            parsed.player_cmd.as_deref().unwrap_or(DEFAULT_PLAYER),
        ))
    }

    pub fn new(base_url: &str, token: &str, player_cmd: &str) -> Config {
        Config {
            base_url: base_url.trim_end_matches('/').into(),
            token: token.into(),
            player_cmd: player_cmd.into(),
        }
    }

    /// Server address without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn config_filepath() -> Result<PathBuf> {
        let pd = ProjectDirs::from("com.vishalk", "ta", "taview")
            .context("Unable to determine configuration directories")?;
        Ok(pd.config_dir().join("taview.json"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let cfg = Config::new("https://ta.example.com/", "tok", "mpv");
        assert_eq!(cfg.base_url(), "https://ta.example.com");

        let cfg = Config::new("https://ta.example.com", "tok", "mpv");
        assert_eq!(cfg.base_url(), "https://ta.example.com");
    }

    #[test]
    fn test_file_parse() {
        let raw = r#"{"server_url": "https://ta.example.com", "api_token": "abc123"}"#;
        let parsed: ConfigFile = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.server_url, "https://ta.example.com");
        assert_eq!(parsed.api_token, "abc123");
        assert!(parsed.player_cmd.is_none());
    }
}
