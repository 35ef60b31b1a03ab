use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walk_tracker_data_management::{gpx_util::default_gpx_dir, DataManager};
use walk_tracker_lib::{format::{format_distance, format_duration}, pet::PetId, walk::WalkRecord};

/// Manual operations on stored walks.
#[derive(Debug, Parser)]
#[command(name = "walk_tracker_data_management", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file, instead of the one in the project data directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stored walks, newest first
    List {
        #[arg(long)]
        pet: Option<String>,
    },
    /// Show one walk with its route
    Show {
        walk_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Store the route in a GPX file as a walk
    ImportGpx {
        pet_id: String,
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Write a walk to a GPX file
    ExportGpx {
        walk_id: i64,
        /// Defaults to the project's gpx directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Change the details of a walk
    Edit {
        walk_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        walk_id: i64,
    },
}

// CLI for manual data operations
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let data_manager = match &cli.database {
        Some(path) => DataManager::open(path).await,
        None => DataManager::start().await,
    }
    .context("failed to open walk database")?;

    match cli.command {
        Command::List { pet } => {
            let pet = pet.map(PetId::from);
            for walk in data_manager.get_walks(pet.as_ref()).await? {
                println!("{}", summary_line(&walk));
            }
        }
        Command::Show { walk_id, json } => {
            let walk = data_manager.get_walk(walk_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&walk)?);
            } else {
                println!("{}", summary_line(&walk));
                if !walk.description.is_empty() {
                    println!("  {}", walk.description);
                }
                if !walk.notes.is_empty() {
                    println!("  Notes: {}", walk.notes);
                }
                for sample in &walk.samples {
                    println!("  {} {:.6}, {:.6}", sample.timestamp.to_rfc3339(), sample.latitude, sample.longitude);
                }
            }
        }
        Command::ImportGpx { pet_id, file, title } => {
            let walk_id = data_manager
                .add_gpx_walk(PetId::from(pet_id), &file, title)
                .await
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!("Imported walk {}", walk_id);
        }
        Command::ExportGpx { walk_id, out } => {
            let out = match out {
                Some(out) => out,
                None => default_gpx_dir()?.join(format!("walk_{}.gpx", walk_id)),
            };
            data_manager.export_walk_gpx(walk_id, &out).await?;
            println!("Wrote {}", out.display());
        }
        Command::Edit { walk_id, title, description, notes } => {
            if let Some(title) = title {
                data_manager.set_walk_title(walk_id, &title).await?;
            }
            if let Some(description) = description {
                data_manager.set_walk_description(walk_id, &description).await?;
            }
            if let Some(notes) = notes {
                data_manager.set_walk_notes(walk_id, &notes).await?;
            }
        }
        Command::Delete { walk_id } => {
            data_manager.delete_walk(walk_id).await?;
            println!("Deleted walk {}", walk_id);
        }
    }

    Ok(())
}

fn summary_line(walk: &WalkRecord) -> String {
    format!(
        "{:>4}  {}  {:<10} {:<24} {:>9} {:>8}",
        walk.walk_id,
        walk.start_time.format("%Y-%m-%d %H:%M"),
        walk.pet_id.as_str(),
        walk.title,
        format_distance(walk.distance),
        format_duration(walk.duration * 1000),
    )
}
