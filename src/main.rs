use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

mod config;
mod error;
mod logging;
mod plot;
mod scrape;
mod utils;

use config::ScrapeConfig;
use scrape::{QuotedJpgExtractor, SearchRequest};

/// Scrape JPEG search results to disk and plot classifier results
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for each keyword and download the JPEG links found on the results page
    Search {
        /// Keywords to search for; prompts when none are given
        keywords: Vec<String>,

        /// Path where to save the images and raw html (overrides the config file)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Amount of images to download per keyword
        #[arg(short, long, default_value = "all")]
        amount: String,

        /// TOML file overriding the scraper defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Render a confusion matrix from a JSON file
    Confusion {
        /// JSON file with `matrix` and `classes`
        #[arg(short, long)]
        input: PathBuf,

        /// Output image; `.svg` keeps the text annotations
        #[arg(short, long, default_value = "confusion_matrix.svg")]
        output: PathBuf,

        /// Divide each row by its sum
        #[arg(long, default_value_t = false)]
        normalize: bool,

        /// Figure title
        #[arg(long, default_value = "Confusion matrix")]
        title: String,
    },
    /// Render a grid of scored images from a JSON file
    Gallery {
        /// JSON array of `{image, pred, label}` records
        #[arg(short, long)]
        input: PathBuf,

        /// Output image; `.svg` keeps the tile titles
        #[arg(short, long, default_value = "gallery.svg")]
        output: PathBuf,

        /// Scores strictly above this are predicted as the second label
        #[arg(short, long, default_value_t = 0.5)]
        threshold: f64,

        /// Names of the two classes
        #[arg(long, num_args = 2, value_names = ["NEGATIVE", "POSITIVE"])]
        labels: Option<Vec<String>>,
    },
}

fn parse_amount(amount: &str) -> anyhow::Result<Option<usize>> {
    if amount == "all" {
        return Ok(None);
    }
    match amount.parse::<usize>() {
        Ok(limit) => Ok(Some(limit)),
        Err(_) => bail!("Invalid amount value: {}", amount),
    }
}

fn prompt_keywords() -> io::Result<String> {
    print!("Enter the search query: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let args = Args::parse();

    match args.command {
        Commands::Search {
            keywords,
            path,
            amount,
            config,
        } => {
            let mut scrape_config =
                ScrapeConfig::load(config.as_deref()).context("failed to load config")?;
            if let Some(path) = path {
                scrape_config.set_output_dir(path);
            }

            let max_count = parse_amount(&amount)?;
            let request = if keywords.is_empty() {
                SearchRequest::from_query(&prompt_keywords()?, max_count)
            } else {
                SearchRequest::from_query(&keywords.join(" "), max_count)
            };

            println!("Path: {}", scrape_config.save_dir.display());
            let summaries = scrape::run_search(&scrape_config, &request, &QuotedJpgExtractor).await;

            for summary in &summaries {
                tracing::info!(
                    "{}: {} links, {} saved, {} skipped",
                    summary.keyword,
                    summary.links_found,
                    summary.report.saved(),
                    summary.report.failed()
                );
                for outcome in summary.report.outcomes.iter().filter(|o| !o.is_saved()) {
                    if let scrape::download::DownloadStatus::Failed { reason } = &outcome.status {
                        tracing::debug!(
                            "#{} {} -> {}: {}",
                            outcome.index,
                            outcome.link,
                            outcome.path.display(),
                            reason
                        );
                    }
                }
            }
        }
        Commands::Confusion {
            input,
            output,
            normalize,
            title,
        } => {
            let data = plot::ConfusionInput::from_file(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let figure = plot::render_confusion_matrix(&data.matrix, &data.classes, normalize)?
                .with_title(title);
            figure.save(&output)?;
            println!("Saved confusion matrix to {}", output.display());
        }
        Commands::Gallery {
            input,
            output,
            threshold,
            labels,
        } => {
            let records = plot::GalleryRecord::from_file(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let labels = labels.unwrap_or_else(|| {
                plot::DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
            });

            let figure = plot::render_gallery(&records, threshold, &labels)?;
            for (i, tile) in figure.tiles.iter().enumerate() {
                println!("[{}] {}\n", i + 1, tile.title);
                tracing::debug!(
                    "{}: score {} predicted {} truth {}",
                    tile.image.display(),
                    tile.score,
                    tile.predicted,
                    tile.truth
                );
            }
            figure.save(&output)?;
            println!("Saved gallery to {}", output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_all_means_no_limit() {
        assert_eq!(parse_amount("all").unwrap(), None);
        assert_eq!(parse_amount("25").unwrap(), Some(25));
        assert!(parse_amount("many").is_err());
    }

    #[test]
    fn search_args_parse() {
        let args = Args::try_parse_from([
            "jpg-fetch", "search", "clio", "megane", "--amount", "3", "--path", "out",
        ])
        .unwrap();

        match args.command {
            Commands::Search {
                keywords,
                path,
                amount,
                config,
            } => {
                assert_eq!(keywords, vec!["clio", "megane"]);
                assert_eq!(path, Some(PathBuf::from("out")));
                assert_eq!(amount, "3");
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn gallery_labels_take_two_values() {
        let args = Args::try_parse_from([
            "jpg-fetch", "gallery", "-i", "r.json", "--labels", "Cat", "Dog",
        ])
        .unwrap();

        match args.command {
            Commands::Gallery {
                labels, threshold, ..
            } => {
                assert_eq!(labels, Some(vec!["Cat".to_string(), "Dog".to_string()]));
                assert_eq!(threshold, 0.5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
