//! Command-line interface
//!
//! Subcommands for syncing the guide, managing favorites, inspecting plants
//! and playing the pattern game in a terminal.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::Config;
use crate::game::{HighScoreTable, PatternEngine, Presenter, PressOutcome, StoredScore, Symbol};
use crate::gateway::HttpGateway;
use crate::guide::{row_label, BootstrapReport, Guide, PlantDetails};
use crate::model::Coordinate;
use crate::store::SqliteStore;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load garden data and print the bed sections
    Sync {
        /// Latitude to order sections from
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude to order sections from
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Manage favorite plants
    #[command(subcommand)]
    Favorite(FavoriteCommands),

    /// Show everything known about a plant
    Details {
        /// Plant record number
        recnum: String,
    },

    /// List high scores
    Scores,

    /// Play the pattern game
    Play,
}

#[derive(Debug, Subcommand)]
pub enum FavoriteCommands {
    /// Mark a plant as favorite
    Add { recnum: String },
    /// Unmark a plant
    Remove { recnum: String },
    /// List favorite plants
    List,
}

/// Run a subcommand, returning text for stdout
pub async fn execute_command(config: &Config, command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Sync { lat, lon } => {
            let (mut guide, report) = open_guide(config).await?;
            if let (Some(lat), Some(lon)) = (lat, lon) {
                guide.update_location(Coordinate::new(lat, lon));
            }
            guide.finish_pending_images().await;
            Ok(format!("{}\n{}", format_report(&report), format_sections(&guide)))
        }

        Commands::Favorite(FavoriteCommands::Add { recnum }) => {
            let (mut guide, _) = open_guide(config).await?;
            guide
                .add_favorite(&recnum)
                .with_context(|| format!("Failed to add favorite {}", recnum))?;
            Ok(format!("Added {}", recnum))
        }

        Commands::Favorite(FavoriteCommands::Remove { recnum }) => {
            let (mut guide, _) = open_guide(config).await?;
            guide
                .remove_favorite(&recnum)
                .with_context(|| format!("Failed to remove favorite {}", recnum))?;
            Ok(format!("Removed {}", recnum))
        }

        Commands::Favorite(FavoriteCommands::List) => {
            let (guide, _) = open_guide(config).await?;
            Ok(format_favorites(&guide))
        }

        Commands::Details { recnum } => {
            let (mut guide, _) = open_guide(config).await?;
            guide.finish_pending_images().await;
            let details = guide
                .plant_details(&recnum)
                .with_context(|| format!("No plant with record number {}", recnum))?;
            Ok(format_details(&details))
        }

        Commands::Scores => {
            let table = open_scores(config)?;
            let scores = table.list().context("Failed to read high scores")?;
            Ok(format_scores(&scores))
        }

        Commands::Play => {
            let table = open_scores(config)?;
            let mut engine = PatternEngine::from_entropy(&config.game, table);
            play(&mut engine).await?;
            let scores = engine.high_scores().context("Failed to read high scores")?;
            Ok(format_scores(&scores))
        }
    }
}

fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(path).with_context(|| format!("Failed to open cache at {}", path.display()))
}

async fn open_guide(config: &Config) -> anyhow::Result<(Guide, BootstrapReport)> {
    let store = open_store(&config.database_path())?;
    let gateway = Arc::new(HttpGateway::new(&config.service));
    let mut guide = Guide::new(gateway, Box::new(store), config.service.images_url.clone());
    let report = guide.bootstrap().await?;
    Ok((guide, report))
}

fn open_scores(config: &Config) -> anyhow::Result<HighScoreTable> {
    let store = open_store(&config.database_path())?;
    Ok(HighScoreTable::new(Box::new(store), config.game.max_high_scores))
}

/// Prints each played symbol and pauses between them
pub struct TerminalPresenter {
    delay: Duration,
}

impl TerminalPresenter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn present(&mut self, symbol: Symbol) {
        println!("  {}", symbol);
        tokio::time::sleep(self.delay).await;
    }
}

async fn play(engine: &mut PatternEngine) -> anyhow::Result<()> {
    let mut presenter = TerminalPresenter::new(Duration::from_millis(500));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Repeat the colours: y(ellow) b(lue) r(ed) g(reen). q quits.");
    info!(length = engine.pattern().len(), "Game started");

    'turns: loop {
        println!("Watch:");
        engine.play_turn(&mut presenter).await?;
        println!("Your turn:");

        loop {
            let Some(line) = lines.next_line().await? else {
                break 'turns;
            };
            if line.trim() == "q" {
                break 'turns;
            }

            for token in line.split_whitespace() {
                let symbol = match token.parse::<Symbol>() {
                    Ok(symbol) => symbol,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                let outcome = engine.check_press(symbol)?;
                match &outcome {
                    PressOutcome::Advance => {}
                    PressOutcome::RoundComplete => println!("Correct!"),
                    PressOutcome::PatternComplete { gained } => {
                        println!("Pattern complete, +{}. Score: {}", gained, engine.score())
                    }
                    PressOutcome::Mismatch { final_score, recorded } => {
                        println!("Wrong! Final score: {}", final_score);
                        if *recorded {
                            println!("New high score!");
                        }
                    }
                }
                if outcome.engine_proceeds() {
                    continue 'turns;
                }
            }
        }
    }

    Ok(())
}

pub fn format_report(report: &BootstrapReport) -> String {
    let mut output = format!("Source: {:?}, {} steps completed", report.path, report.completed.len());
    for (stage, error) in &report.failed {
        output.push_str(&format!("\n  {:?} failed: {}", stage, error));
    }
    output
}

pub fn format_sections(guide: &Guide) -> String {
    if guide.sections().is_empty() {
        return "No sections".to_string();
    }

    let mut output = String::new();
    for section in guide.sections() {
        output.push_str(&format!("== {} ({}) ==\n", guide.bed_name(&section.bed_id), section.bed_id));
        for plant in &section.plants {
            let star = if guide.is_favorite(&plant.recnum) { "*" } else { " " };
            output.push_str(&format!("{} [{}]\n", star, plant.recnum));
            for line in row_label(plant).lines() {
                output.push_str(&format!("    {}\n", line));
            }
        }
    }
    output
}

pub fn format_favorites(guide: &Guide) -> String {
    if guide.favorites().is_empty() {
        return "No favorites".to_string();
    }
    guide
        .favorites()
        .iter()
        .map(|recnum| match guide.plant(recnum) {
            Some(plant) => {
                let name = row_label(plant).lines().next().unwrap_or_default().to_string();
                format!("{} {}", recnum, name)
            }
            None => recnum.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_details(details: &PlantDetails) -> String {
    let mut output = format!("Plant {}\n", details.recnum);
    for (label, value) in &details.fields {
        output.push_str(&format!("  {:<24} {}\n", label, value));
    }
    if let Some(location) = &details.location {
        output.push_str(&format!(
            "  Origin: {} ({}, {})\n",
            location.title, location.coordinate.latitude, location.coordinate.longitude
        ));
    }
    for url in &details.image_urls {
        output.push_str(&format!("  Image: {}\n", url));
    }
    output
}

pub fn format_scores(scores: &[StoredScore]) -> String {
    if scores.is_empty() {
        return "No high scores".to_string();
    }
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{:>2}. {:>5}  {}", i + 1, s.score, s.display_date()))
        .collect::<Vec<_>>()
        .join("\n")
}
