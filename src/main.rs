pub mod centroid;
pub mod classify;
pub mod config;
pub mod crs;
pub mod data;
pub mod error;
pub mod export;
pub mod join;
pub mod metrics;
pub mod pipeline;
pub mod preview;
pub mod render;
pub mod schema;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the choropleth maps (and the optional table CSV)
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render PNG previews of the joined geometry in EPSG:4326 and EPSG:3035
    Preview {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the joined table's size, map centre and metric breakpoints
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating maps with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // 1. Load, normalize and join
            let prepared = pipeline::prepare(&app_config)?;

            // 2. Centre the maps
            let center = centroid::map_center(&prepared.table)?;

            // 3. Render
            render::write_maps(&app_config, &prepared.table, &prepared.boroughs, center)?;

            if let Some(file) = &app_config.output.table_csv {
                export::write_table_csv(&prepared.table, &app_config.output.dir.join(file))?;
            }

            info!("Generation complete!");
        }
        Commands::Preview { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let prepared = pipeline::prepare(&app_config)?;
            preview::write_previews(&app_config, &prepared.table)?;
        }
        Commands::Inspect { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let prepared = pipeline::prepare(&app_config)?;
            let table = &prepared.table;
            let center = centroid::map_center(table)?;

            println!("spatial units: {}", table.len());
            println!("boroughs:      {}", prepared.boroughs.len());
            println!("crs:           {}", table.crs);
            println!("map centre:    {:.6}, {:.6}", center.lat, center.lon);
            for metric in types::Metric::ALL {
                let values = table.values(metric);
                let undefined = table.len() - values.len();
                match classify::ColorScale::quantile_ylgnbu(metric.column(), &values) {
                    Ok(scale) => println!("{:<14} {:?} ({} undefined)", metric, scale.breaks, undefined),
                    Err(e) => println!("{:<14} {}", metric, e),
                }
            }
        }
    }

    Ok(())
}
