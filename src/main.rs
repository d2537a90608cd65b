use anyhow::bail;
use clap::Parser;
use std::time::Duration;

mod app;
mod catalog;
mod cli;
mod config;
mod course;
mod scrape;
mod semantic;
mod web;

use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = Config::load();

    match args.command {
        cli::Command::Daemon {} => {
            let app_mgr = app::App::new(config)?;
            web::start_daemon(app_mgr);
            Ok(())
        }

        cli::Command::Catalog {} => {
            // no embedding work needed; skip model initialization
            let service = catalog::CatalogService::new(
                config.catalog.channel_url.clone(),
                config.catalog.max_playlists,
                Duration::from_secs(config.catalog.ttl_secs),
            );
            let courses = service.courses();
            println!("{}", serde_json::to_string_pretty(&courses).unwrap());
            Ok(())
        }

        cli::Command::Search {
            course,
            query,
            top_k,
        } => {
            let app_mgr = app::App::new(config)?;

            match app_mgr.load_course(&course) {
                Ok(app::LoadOutcome::Indexed { count, .. }) => {
                    log::info!("indexed {count} videos");
                }
                Ok(app::LoadOutcome::NoVideos) => {
                    println!("No videos found in this playlist.");
                    return Ok(());
                }
                Err(app::AppError::UnknownCourse(title)) => {
                    bail!("unknown course '{title}' (run `lectern catalog` for the list)");
                }
                Err(err) => return Err(err.into()),
            }

            match app_mgr.search(&query, top_k)? {
                app::SearchOutcome::Matches { matches, .. } => {
                    println!("{}", serde_json::to_string_pretty(&matches).unwrap());
                }
                app::SearchOutcome::NoCloseMatches { .. } => {
                    println!("No close matches found. Try a different term.");
                }
                app::SearchOutcome::NoCourseLoaded => {
                    unreachable!("course was just loaded");
                }
            }

            Ok(())
        }
    }
}
