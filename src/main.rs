use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodrec::config::AppConfig;
use moodrec::dataset::models::Track;
use moodrec::dataset::Dataset;
use moodrec::embedding::EmbeddingModel;
use moodrec::mood::Mood;
use moodrec::preview::{DeezerClient, NoPreview, PreviewLookup};
use moodrec::recommend::{self, ModelPolicy, Recommendation, Recommender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Rows shown by the browse views.
const BROWSE_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "moodrec", version, about = "Mood-aware song recommender")]
struct Cli {
    /// Path to the song dataset CSV
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Directory holding the trained model
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Directory for CSV output
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Skip preview-audio lookups
    #[arg(long, global = true)]
    no_preview: bool,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the dataset, label moods, and write cleaned_data.csv
    Clean,

    /// Train the autoencoder (or confirm an existing one)
    Train {
        /// Discard the persisted model and retrain
        #[arg(long)]
        force: bool,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Recommend songs similar to a given song
    Recommend {
        /// Song name (case-insensitive exact match)
        song: String,

        /// Number of recommendations (defaults to config top_n)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Rows per page (defaults to config page_size)
        #[arg(long)]
        page_size: Option<usize>,

        /// Print every result without prompting
        #[arg(long)]
        no_pager: bool,

        /// Fail instead of training when no model exists
        #[arg(long)]
        no_train: bool,

        /// Rank by scaled audio features instead of the autoencoder
        #[arg(long)]
        raw: bool,
    },

    /// Find songs whose name contains the given text
    Search {
        /// Text to search for (substring, case-insensitive)
        text: String,

        /// Number of results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Most popular songs by an artist
    Artist {
        /// Artist name
        name: String,
    },

    /// Random songs with a given mood
    Mood {
        /// happy, angry, sad or calm
        mood: Mood,

        /// Seed for reproducible picks
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Most popular songs overall
    Top,

    /// Show dataset, mood, and model statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = AppConfig::load();

    // CLI > config > defaults
    if let Some(path) = cli.dataset {
        config.dataset_path = path;
    }
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.no_preview {
        config.preview.enabled = false;
    }

    let dataset = Dataset::load(&config.dataset_path)
        .with_context(|| format!("Failed to load dataset {}", config.dataset_path.display()))?;

    let lookup: Box<dyn PreviewLookup> = if config.preview.enabled {
        Box::new(DeezerClient::new(&config.preview.base_url, config.preview.timeout()))
    } else {
        Box::new(NoPreview)
    };

    match cli.command {
        Commands::Clean => {
            let path = config.cleaned_data_path();
            dataset.save_cleaned(&path).context("Failed to write cleaned dataset")?;
            println!(
                "Clean complete: {} tracks kept, {} dropped -> {}",
                dataset.len(),
                dataset.dropped(),
                path.display()
            );
        }

        Commands::Train { force, epochs } => {
            if let Some(e) = epochs {
                config.training.epochs = e;
            }
            if force {
                EmbeddingModel::remove(&config.model_dir).context("Failed to remove old model")?;
            }
            if EmbeddingModel::exists(&config.model_dir) {
                println!(
                    "Model already trained in {} (use --force to retrain)",
                    config.model_dir.display()
                );
                return Ok(());
            }

            let recommender = Recommender::new(
                dataset,
                &config.model_dir,
                config.training.clone(),
                ModelPolicy::LoadOrTrain,
            );
            let model = recommender.train().context("Training failed")?;
            println!(
                "Training complete: {} tracks, {} epochs, final loss {:.5} -> {}",
                model.metadata().trained_rows,
                model.metadata().training.epochs,
                model.metadata().final_loss.unwrap_or(f32::NAN),
                config.model_dir.display()
            );
        }

        Commands::Recommend { song, limit, page_size, no_pager, no_train, raw } => {
            let top_n = limit.unwrap_or(config.top_n);
            let page_size = page_size.unwrap_or(config.page_size);
            let policy = if no_train { ModelPolicy::LoadOnly } else { ModelPolicy::LoadOrTrain };
            let recommender = Recommender::new(
                dataset,
                &config.model_dir,
                config.training.clone(),
                policy,
            );

            let found = if raw {
                recommender.recommend_by_features(&song, top_n)
            } else {
                recommender.recommend(&song, top_n).context("Recommendation failed")?
            };

            let mut recs = match found {
                Some(r) => r,
                None => {
                    println!("No song named \"{}\". Try `moodrec search`.", song);
                    return Ok(());
                }
            };

            if recs.is_empty() {
                println!("No recommendations available for \"{}\".", song);
                return Ok(());
            }

            if config.preview.enabled {
                println!("Looking up previews for {} tracks...", recs.len());
            }
            recommend::enrich_previews(&mut recs, lookup.as_ref());

            let output_path = config.recommendations_path();
            recommend::write_recommendations(&output_path, &recs)
                .context("Failed to write recommendations")?;

            print_paged(&song, &recs, page_size, no_pager, &output_path)?;
        }

        Commands::Search { text, limit } => {
            let hits = dataset.search(&text);
            if hits.is_empty() {
                println!("No songs matching \"{}\".", text);
                return Ok(());
            }
            println!("{} songs matching \"{}\":", hits.len(), text);
            println!();
            print_track_table(&hits[..hits.len().min(limit)], None);
        }

        Commands::Artist { name } => {
            let top = moodrec::browse::top_by_artist(&dataset, &name, BROWSE_LIMIT);
            if top.is_empty() {
                println!("No songs by \"{}\".", name);
                return Ok(());
            }
            println!("Most popular songs by {}:", name);
            println!();
            print_track_table(&top, Some(lookup.as_ref()));
        }

        Commands::Mood { mood, seed } => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let picks = moodrec::browse::random_by_mood(&dataset, mood, BROWSE_LIMIT, &mut rng);
            if picks.is_empty() {
                println!("No {} songs in the dataset.", mood);
                return Ok(());
            }
            println!("Songs with mood {}:", mood);
            println!();
            print_track_table(&picks, Some(lookup.as_ref()));
        }

        Commands::Top => {
            let top = moodrec::browse::most_popular(&dataset, BROWSE_LIMIT);
            println!("Top {} most popular songs:", top.len());
            println!();
            print_track_table(&top, Some(lookup.as_ref()));
        }

        Commands::Stats => {
            println!("Dataset Statistics");
            println!("==================");
            println!("Tracks:           {}", dataset.len());
            println!("Dropped rows:     {}", dataset.dropped());
            println!();

            println!("{:<8} {:>8} {:>12}", "Mood", "Tracks", "Avg pop.");
            println!("{}", "-".repeat(30));
            for s in moodrec::browse::mood_stats(&dataset) {
                println!("{:<8} {:>8} {:>12.1}", s.mood, s.tracks, s.mean_popularity);
            }
            println!();

            if EmbeddingModel::exists(&config.model_dir) {
                let recommender = Recommender::new(
                    dataset,
                    &config.model_dir,
                    config.training.clone(),
                    ModelPolicy::LoadOnly,
                );
                let model = recommender.model().context("Failed to load model")?;
                let meta = model.metadata();
                let current = recommender.scaler();
                println!("Model:            {}", config.model_dir.display());
                println!("Trained at:       {}", meta.trained_at.format("%Y-%m-%d %H:%M UTC"));
                println!("Trained rows:     {}", meta.trained_rows);
                println!("Final loss:       {:.5}", meta.final_loss.unwrap_or(f32::NAN));
                println!(
                    "Matches dataset:  {}",
                    if meta.scaler.approx_eq(current, 1e-9) { "yes" } else { "no (retrain suggested)" }
                );
            } else {
                println!("Model:            not trained (run `moodrec train`)");
            }
        }
    }

    Ok(())
}

/// Truncate to `width` chars with an ellipsis.
fn clip(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Print recommendations a page at a time, asking before each next page.
fn print_paged(
    song: &str,
    recs: &[Recommendation],
    page_size: usize,
    no_pager: bool,
    output_path: &std::path::Path,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    println!("Songs similar to \"{}\":", song);
    for range in recommend::page_ranges(recs.len(), page_size) {
        let end = range.end;
        println!();
        print_recommendation_table(&recs[range]);
        println!();
        println!("Saved to: {}", output_path.display());

        if no_pager || end >= recs.len() {
            continue;
        }
        print!("Show more recommendations? (y/n): ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if answer.trim().to_lowercase() != "y" {
            break;
        }
    }
    Ok(())
}

fn print_recommendation_table(recs: &[Recommendation]) {
    println!(
        "{:<30} {:<25} {:>4} {:<6} {:>6}  {}",
        "Song", "Artist", "Pop", "Mood", "Sim", "Preview"
    );
    println!("{}", "-".repeat(100));

    for r in recs {
        println!(
            "{:<30} {:<25} {:>4} {:<6} {:>6.3}  {}",
            clip(&r.track.name, 30),
            clip(r.track.primary_artist(), 25),
            r.track.popularity,
            r.track.mood,
            r.similarity,
            r.preview_url.as_deref().unwrap_or("-"),
        );
    }
}

/// Print a table of tracks, optionally with preview URLs.
fn print_track_table(tracks: &[&Track], lookup: Option<&dyn PreviewLookup>) {
    println!(
        "{:<30} {:<25} {:>4} {:<6}  {}",
        "Song", "Artist", "Pop", "Mood", "Preview"
    );
    println!("{}", "-".repeat(90));

    for t in tracks {
        let preview = lookup
            .and_then(|l| l.preview_url(&t.name, Some(t.primary_artist())))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<30} {:<25} {:>4} {:<6}  {}",
            clip(&t.name, 30),
            clip(t.primary_artist(), 25),
            t.popularity,
            t.mood,
            preview,
        );
    }
}
