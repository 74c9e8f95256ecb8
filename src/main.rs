mod cli;

use reelforge::{
    catalog::Catalog,
    config::{self, Config},
    pipeline::{ConvertableStore, PipelineEvent},
    service::PipelineService,
    watch,
};
use reelforge_av::tools::get_tool_path;
use reelforge_av::{FfprobeProbe, MediaProbe};
use reelforge_common::{RenditionProfile, VideoId};
use reelforge_db::pool::{init_pool, DbPool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

fn open_database(config: &Config) -> Result<DbPool> {
    let path = config.database.path.to_string_lossy();
    tracing::info!("Opening database at {}", path);
    init_pool(&path).with_context(|| format!("Failed to open database {}", path))
}

async fn start(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let db = open_database(&config)?;

    tracing::info!(
        workers = config.pipeline.workers,
        queue_capacity = config.pipeline.queue_capacity,
        "Starting Reelforge pipeline"
    );

    let mut service = PipelineService::new(&config, db);
    let cancel = CancellationToken::new();

    let trigger_handle = service.spawn_trigger(cancel.clone());

    let mut watcher = watch::FileWatcher::new(config.watch.clone(), service.catalog().clone());
    let watcher_handle = watcher.start(cancel.clone())?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down, waiting for queued jobs...");
    cancel.cancel();
    watcher.stop();
    if let Some(handle) = watcher_handle {
        let _ = handle.await;
    }
    if let Some(handle) = trigger_handle {
        let _ = handle.await;
    }
    service.shutdown().await;

    Ok(())
}

async fn process_file(
    file: &Path,
    title: Option<String>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !file.exists() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }
    // Derived outputs are named after the source, so always work from one
    // canonical spelling of its path.
    let file = file
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", file))?;

    let db = open_database(&config)?;
    let mut service = PipelineService::new(&config, db.clone());
    let mut progress = service.events().subscribe();

    let report = match service.catalog().find_by_source_path(&file)? {
        Some(existing) => {
            println!("Already registered as {}, re-running", existing.id);
            service.rerun(existing.id).await
        }
        None => {
            let title = title.unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let video = service.catalog().create_video(&title, Some(&file))?;
            println!("Registered {} as {}", file.display(), video.id);

            match service.process_pending().await.pop() {
                Some(result) => result,
                None => anyhow::bail!("Pipeline was not triggered for {}", video.id),
            }
        }
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            service.shutdown().await;
            return Err(e).context("Pipeline run failed");
        }
    };

    println!(
        "Duration: {:.2}s, {} jobs queued",
        report.duration_secs, report.jobs_submitted
    );

    service.shutdown().await;

    while let Ok(event) = progress.try_recv() {
        match event.payload {
            PipelineEvent::RenditionReady { profile, path, .. } => {
                println!("  ✓ {} {}", profile, path.display());
            }
            PipelineEvent::RenditionFailed { profile, error, .. } => {
                println!("  ✗ {} {}", profile, error);
            }
            PipelineEvent::ThumbnailReady { path, .. } => {
                println!("  ✓ thumbnail {}", path.display());
            }
            PipelineEvent::ThumbnailFailed { error, .. } => {
                println!("  ✗ thumbnail {}", error);
            }
            _ => {}
        }
    }

    print_status(&db, report.video_id, false)
}

async fn rerun(video_id: &str, config_path: Option<&Path>) -> Result<()> {
    let video_id: VideoId = video_id.parse().context("Invalid video ID")?;
    let config = config::load_config_or_default(config_path)?;
    let db = open_database(&config)?;

    let service = PipelineService::new(&config, db.clone());
    let result = service.rerun(video_id).await;
    service.shutdown().await;

    let report = result.context("Re-run failed")?;
    println!("Re-ran {} ({} jobs)", report.video_id, report.jobs_submitted);

    print_status(&db, video_id, false)
}

fn status(video_id: &str, json: bool, config_path: Option<&Path>) -> Result<()> {
    let video_id: VideoId = video_id.parse().context("Invalid video ID")?;
    let config = config::load_config_or_default(config_path)?;
    let db = open_database(&config)?;

    print_status(&db, video_id, json)
}

fn print_status(db: &DbPool, video_id: VideoId, json: bool) -> Result<()> {
    let (catalog, _events) = Catalog::new(db.clone());
    let store = ConvertableStore::new(db.clone());

    let video = catalog
        .get_video(video_id)?
        .with_context(|| format!("Video {} not found", video_id))?;
    let record = store.get_for_video(video_id)?;

    if json {
        let value = serde_json::json!({
            "video": video,
            "convertables": record,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Video: {} ({})", video.title, video.id);
    println!("Source: {}", video.source().unwrap_or("-"));
    match video.duration_secs {
        Some(secs) => println!("Duration: {:.2}s", secs),
        None => println!("Duration: unprocessed"),
    }
    println!(
        "Thumbnail: {}",
        video.thumbnail_path.as_deref().unwrap_or("-")
    );

    println!("\nRenditions:");
    for profile in RenditionProfile::ALL {
        let path = record.as_ref().and_then(|r| r.rendition(profile));
        println!("  {:>5}  {}", profile.label(), path.unwrap_or("not yet available"));
    }

    Ok(())
}

fn list(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let db = open_database(&config)?;
    let (catalog, _events) = Catalog::new(db.clone());
    let store = ConvertableStore::new(db);

    let videos = catalog.list_videos()?;
    if videos.is_empty() {
        println!("No videos");
        return Ok(());
    }

    for video in videos {
        let done = store
            .get_for_video(video.id)?
            .map(|r| r.available_profiles().len())
            .unwrap_or(0);
        println!(
            "{}  {:<30}  {}/{} renditions  {}",
            video.id,
            video.title,
            done,
            RenditionProfile::ALL.len(),
            video.source().unwrap_or("-")
        );
    }

    Ok(())
}

async fn probe_file(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let program = get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())?;
    let probe = FfprobeProbe::new(program, config.pipeline.job_timeout());

    let duration = probe.duration(file).await?;
    println!("File: {}", file.display());

    let secs = duration as u64;
    println!(
        "Duration: {:02}:{:02}:{:02} ({:.3}s)",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let ffmpeg = config
        .tools
        .ffmpeg_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffmpeg"));
    let ffprobe = config
        .tools
        .ffprobe_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffprobe"));

    let tools = reelforge_av::check_tools(&ffmpeg, &ffprobe);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Database: {}", config.database.path.display());
    println!(
        "  Workers: {} (queue {})",
        config.pipeline.workers, config.pipeline.queue_capacity
    );
    println!("  Job timeout: {}s", config.pipeline.job_timeout_secs);
    for profile in RenditionProfile::ALL {
        let settings = config.profiles.settings(profile);
        println!(
            "  {:>5}: {} {} crf {} / {}",
            profile.label(),
            settings.resolution,
            settings.video_codec,
            settings.crf,
            settings.audio_codec
        );
    }
    println!("  Watch enabled: {}", config.watch.enabled);
    println!("  Watch paths: {}", config.watch.paths.len());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=trace,reelforge_av=trace,reelforge_db=debug,reelforge_common=debug".to_string()
        } else {
            "reelforge=info,reelforge_av=info,reelforge_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start => runtime()?.block_on(start(config_path)),
        Commands::Process { file, title } => {
            runtime()?.block_on(process_file(&file, title, config_path))
        }
        Commands::Rerun { video_id } => runtime()?.block_on(rerun(&video_id, config_path)),
        Commands::Status { video_id, json } => status(&video_id, json, config_path),
        Commands::List => list(config_path),
        Commands::Probe { file } => runtime()?.block_on(probe_file(&file, config_path)),
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => validate_config(validate_path.as_deref().or(config_path)),
        Commands::Version => {
            println!("reelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}
