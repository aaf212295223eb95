use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::TimeZone;
use clap::{App, Arg, SubCommand};
use log::{debug, info, warn};

use crate::common::Video;
use crate::config::Config;
use crate::repo::Repository;
use crate::tracker::ProgressTracker;

fn repo() -> Result<Repository> {
    let cfg = Config::load()?;
    Ok(Repository::new(&cfg))
}

fn paging_args(matches: &clap::ArgMatches) -> Result<(u32, u32)> {
    let page = matches
        .value_of("page")
        .expect("page has a default")
        .parse()
        .context("--page must be a number")?;
    let page_size = matches
        .value_of("page-size")
        .expect("page-size has a default")
        .parse()
        .context("--page-size must be a number")?;
    Ok((page, page_size))
}

fn downloaded_str(v: &Video) -> String {
    match chrono::Utc.timestamp_millis_opt(v.date_downloaded).single() {
        Some(when) => when.format("%Y-%m-%d").to_string(),
        None => "?".into(),
    }
}

fn print_video_row(v: &Video) {
    let watched = if v.watched { "*" } else { " " };
    println!(
        "{} {}  {:>8}  {}  ({})",
        watched, v.id, v.duration_str, v.title, v.channel_name
    );
}

fn print_video_detail(v: &Video) {
    println!(
        "ID: {}\nTitle: {}\nChannel: {} ({})\nDuration: {}\nPublished: {}\nDownloaded: {}\nWatched: {}\nViews: {}\nLikes: {}\nTags: {}\nStream: {}\nThumbnail: {}\n{}",
        v.id,
        v.title,
        v.channel_name,
        v.channel_id,
        v.duration_str,
        v.published,
        downloaded_str(v),
        v.watched,
        v.view_count,
        v.like_count,
        v.tags.join(", "),
        v.stream_url,
        v.thumbnail_url,
        v.description,
    );
}

fn videos(page: u32, page_size: u32) -> Result<()> {
    for v in repo()?.videos(page, page_size)? {
        print_video_row(&v);
    }
    Ok(())
}

fn video(video_id: &str) -> Result<()> {
    let v = repo()?.video_details(video_id)?;
    print_video_detail(&v);
    Ok(())
}

fn search(query: &str, page: u32, page_size: u32) -> Result<()> {
    let found = repo()?.search_videos(query, page, page_size)?;
    if found.is_empty() {
        println!("No videos matching {:?}", query);
    }
    for v in found {
        print_video_row(&v);
    }
    Ok(())
}

fn channels(page: u32, page_size: u32) -> Result<()> {
    for c in repo()?.channels(page, page_size)? {
        println!(
            "{} - {} ({} subscribers)\nThumbnail: {}",
            c.id, c.name, c.subscriber_count, c.thumbnail_url
        );
    }
    Ok(())
}

fn channel(channel_id: &str) -> Result<()> {
    let c = repo()?.channel_details(channel_id)?;
    println!(
        "ID: {}\nName: {}\nSubscribers: {}\nViews: {}\nThumbnail: {}\nBanner: {}\n{}",
        c.id, c.name, c.subscriber_count, c.view_count, c.thumbnail_url, c.banner_url, c.description,
    );
    Ok(())
}

fn channel_videos(channel_id: &str, page: u32, page_size: u32) -> Result<()> {
    for v in repo()?.channel_videos(channel_id, page, page_size)? {
        print_video_row(&v);
    }
    Ok(())
}

fn playlists(page: u32, page_size: u32) -> Result<()> {
    for p in repo()?.playlists(page, page_size)? {
        println!("{} - {} ({})", p.id, p.name, p.channel_name);
    }
    Ok(())
}

/// One-shot progress report, e.g for scripting resume points
fn progress(video_id: &str, position: u64) -> Result<()> {
    repo()?.update_watch_progress(video_id, position)?;
    info!("Recorded position {}s for {}", position, video_id);
    Ok(())
}

/// Stream a video in an external player, reporting watch progress while
/// it runs
fn watch(video_id: &str, player_override: Option<&str>) -> Result<()> {
    let cfg = Config::load()?;
    let repo = Repository::new(&cfg);

    let video = repo.video_details(video_id)?;
    let player = player_override.unwrap_or(&cfg.player_cmd);
    info!("Playing {:?} with {}", video.title, player);
    debug!("Stream URL: {}", &video.stream_url);

    let mut child = Command::new(player)
        .arg(&video.stream_url)
        .spawn()
        .with_context(|| format!("Failed to launch player {:?}", player))?;

    let mut tracker = ProgressTracker::start(Arc::new(repo), video_id);
    tracker.set_playing(true);

    // The player gives no position feedback over this interface, so
    // elapsed wall time stands in for the playback position
    let started = Instant::now();
    let exit = loop {
        if let Some(exit) = child.try_wait()? {
            break exit;
        }
        tracker.set_position(started.elapsed().as_secs());
        std::thread::sleep(Duration::from_secs(1));
    };
    tracker.set_playing(false);
    tracker.stop();

    if !exit.success() {
        warn!("Player exited with status {}", exit);
    }
    Ok(())
}

fn config_logging(verbosity: u64) -> Result<()> {
    // Level for this application
    let internal_level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,  // -v
        2 => log::LevelFilter::Debug, // -vv
        _ => log::LevelFilter::Trace, // -vvv
    };

    // Show log output for 3rd party library at -vvv
    let thirdparty_level = match verbosity {
        0 | 1 | 2 => log::LevelFilter::Warn,
        _ => log::LevelFilter::Debug, // -vvv
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(thirdparty_level)
        .level_for("taview", internal_level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

fn page_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("page")
            .long("page")
            .takes_value(true)
            .default_value("1"),
        Arg::with_name("page-size")
            .long("page-size")
            .takes_value(true)
            .default_value("25"),
    ]
}

pub fn main() -> Result<()> {
    let sc_videos = SubCommand::with_name("videos")
        .about("List videos in the archive")
        .args(&page_args());

    let sc_video = SubCommand::with_name("video")
        .about("Show details for one video")
        .arg(Arg::with_name("id").required(true));

    let sc_search = SubCommand::with_name("search")
        .about("Search videos")
        .arg(Arg::with_name("query").required(true))
        .args(&page_args());

    let sc_channels = SubCommand::with_name("channels")
        .about("List channels")
        .args(&page_args());

    let sc_channel = SubCommand::with_name("channel")
        .about("Show details for one channel")
        .arg(Arg::with_name("id").required(true));

    let sc_channel_videos = SubCommand::with_name("channel-videos")
        .about("List videos in a channel")
        .arg(Arg::with_name("id").required(true))
        .args(&page_args());

    let sc_playlists = SubCommand::with_name("playlists")
        .about("List playlists")
        .args(&page_args());

    let sc_progress = SubCommand::with_name("progress")
        .about("Record a watch position for a video")
        .arg(Arg::with_name("id").required(true))
        .arg(Arg::with_name("position").required(true));

    let sc_watch = SubCommand::with_name("watch")
        .about("Play a video in an external player, tracking progress")
        .arg(Arg::with_name("id").required(true))
        .arg(
            Arg::with_name("player")
                .long("player")
                .takes_value(true)
                .help("Player command, overrides config (default mpv)"),
        );

    let app = App::new("taview")
        .subcommand(sc_videos)
        .subcommand(sc_video)
        .subcommand(sc_search)
        .subcommand(sc_channels)
        .subcommand(sc_channel)
        .subcommand(sc_channel_videos)
        .subcommand(sc_playlists)
        .subcommand(sc_progress)
        .subcommand(sc_watch)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .takes_value(false)
                .global(true),
        );

    // Parse
    let app_m = app.get_matches();

    // Logging levels
    let verbosity = app_m.occurrences_of("verbose");
    config_logging(verbosity)?;

    match app_m.subcommand() {
        ("videos", Some(sub_m)) => {
            let (page, page_size) = paging_args(sub_m)?;
            videos(page, page_size)?
        }
        ("video", Some(sub_m)) => video(sub_m.value_of("id").expect("required arg id missing"))?,
        ("search", Some(sub_m)) => {
            let (page, page_size) = paging_args(sub_m)?;
            search(
                sub_m.value_of("query").expect("required arg query missing"),
                page,
                page_size,
            )?
        }
        ("channels", Some(sub_m)) => {
            let (page, page_size) = paging_args(sub_m)?;
            channels(page, page_size)?
        }
        ("channel", Some(sub_m)) => channel(sub_m.value_of("id").expect("required arg id missing"))?,
        ("channel-videos", Some(sub_m)) => {
            let (page, page_size) = paging_args(sub_m)?;
            channel_videos(
                sub_m.value_of("id").expect("required arg id missing"),
                page,
                page_size,
            )?
        }
        ("playlists", Some(sub_m)) => {
            let (page, page_size) = paging_args(sub_m)?;
            playlists(page, page_size)?
        }
        ("progress", Some(sub_m)) => progress(
            sub_m.value_of("id").expect("required arg id missing"),
            sub_m
                .value_of("position")
                .expect("required arg position missing")
                .parse()
                .context("position must be whole seconds")?,
        )?,
        ("watch", Some(sub_m)) => watch(
            sub_m.value_of("id").expect("required arg id missing"),
            sub_m.value_of("player"),
        )?,
        _ => {
            return Err(anyhow::anyhow!("Unhandled subcommand"));
        }
    };

    Ok(())
}
