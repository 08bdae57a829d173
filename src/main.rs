use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use photo_curator::config::Settings;
use photo_curator::db::Database;
use photo_curator::report::ExportOptions;
use photo_curator::{aesthetics, dedup, embeddings, ingest, logging, report, select, technical};

#[derive(Parser)]
#[command(name = "photo-curator", version, about = "Curate photo collections: dedup, score, and pick the best shots")]
struct Cli {
    /// Path to a TOML config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan root directories and register photos in the catalogue
    Ingest {
        /// Directories to scan. Defaults to default_roots from the config.
        roots: Vec<PathBuf>,

        /// Report what would be ingested without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Re-process files even when mtime and size are unchanged
        #[arg(long)]
        force: bool,
    },

    /// Compute sharpness, contrast, exposure and noise metrics
    ScoreTechnical {
        /// Recompute metrics that already exist
        #[arg(long)]
        force: bool,
    },

    /// Compute embedding vectors for similarity comparison
    Embed {
        /// Recompute embeddings that already exist
        #[arg(long)]
        force: bool,
    },

    /// Derive aesthetic scores from the technical metrics
    ScoreAesthetic,

    /// Group near-identical photos into duplicate clusters
    Dedup {
        /// Hamming distance threshold in bits (0..=64)
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// Pick the top N photos, balancing quality against visual variety
    SelectTop {
        /// How many photos to select
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Directory to export the ranked picks into
        #[arg(long)]
        output: Option<PathBuf>,

        /// Copy the original files into the output directory
        #[arg(long)]
        copy: bool,

        /// Symlink the original files instead of copying
        #[arg(long, conflicts_with = "copy")]
        link: bool,
    },

    /// Run every stage in order: ingest through selection and reports
    Pipeline {
        /// Directories to scan. Defaults to default_roots from the config.
        roots: Vec<PathBuf>,

        /// How many photos to select
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Re-process every stage from scratch
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // CLI overrides go through the same validation as config-file values.
    match &cli.command {
        Command::Dedup {
            threshold: Some(threshold),
        } => settings.dedup_threshold = *threshold,
        Command::SelectTop {
            top_n: Some(top_n), ..
        } => settings.top_n = *top_n,
        Command::Pipeline {
            top_n: Some(top_n), ..
        } => settings.top_n = *top_n,
        _ => {}
    }
    settings.validate()?;
    settings.ensure_dirs()?;

    logging::init(&settings.log_dir)?;

    let mut db = Database::open(&settings.db_path)?;
    db.initialize()?;

    match cli.command {
        Command::Ingest {
            roots,
            dry_run,
            force,
        } => {
            let roots = resolve_roots(roots, &settings);
            let stats = ingest::ingest(&db, &settings, &roots, &settings.extensions, dry_run, force)?;
            println!(
                "Scanned {} files: {} ingested, {} skipped",
                stats.scanned, stats.inserted, stats.skipped
            );
        }
        Command::ScoreTechnical { force } => {
            let stats = technical::score_technical(&db, settings.max_image_size, force)?;
            println!("Scored {} photos, {} skipped", stats.processed, stats.skipped);
        }
        Command::Embed { force } => {
            let stats = embeddings::embed(&db, &settings.embedding_model_name, force)?;
            println!("Embedded {} photos", stats.processed);
        }
        Command::ScoreAesthetic => {
            let stats = aesthetics::score_aesthetic(&db)?;
            println!("Scored {} photos", stats.processed);
        }
        Command::Dedup { .. } => {
            let stats = dedup::dedup(&mut db, &settings, settings.dedup_threshold)?;
            println!(
                "Found {} duplicate clusters covering {} photos ({} skipped)",
                stats.clusters, stats.members, stats.skipped
            );
        }
        Command::SelectTop {
            output, copy, link, ..
        } => {
            let outcome = select::select_top(&mut db, &settings, settings.top_n)?;
            report::export_reports(
                &db,
                outcome.run_id,
                &settings.report_dir,
                &settings.thumbs_dir,
                &ExportOptions {
                    output_dir: output.as_deref(),
                    copy_files: copy,
                    link_files: link,
                },
            )?;
            println!(
                "Selected {} photos (run {}); reports in {}",
                outcome.selected.len(),
                outcome.run_id,
                settings.report_dir.display()
            );
        }
        Command::Pipeline { roots, force, .. } => {
            let roots = resolve_roots(roots, &settings);

            info!("Pipeline: ingest");
            ingest::ingest(&db, &settings, &roots, &settings.extensions, false, force)?;
            info!("Pipeline: technical scoring");
            technical::score_technical(&db, settings.max_image_size, force)?;
            info!("Pipeline: embeddings");
            embeddings::embed(&db, &settings.embedding_model_name, force)?;
            info!("Pipeline: aesthetic scoring");
            aesthetics::score_aesthetic(&db)?;
            info!("Pipeline: duplicate clustering");
            dedup::dedup(&mut db, &settings, settings.dedup_threshold)?;
            info!("Pipeline: selection");
            let outcome = select::select_top(&mut db, &settings, settings.top_n)?;
            report::export_reports(
                &db,
                outcome.run_id,
                &settings.report_dir,
                &settings.thumbs_dir,
                &ExportOptions::default(),
            )?;
            println!(
                "Pipeline complete: {} photos selected (run {}); reports in {}",
                outcome.selected.len(),
                outcome.run_id,
                settings.report_dir.display()
            );
        }
    }

    Ok(())
}

fn resolve_roots(roots: Vec<PathBuf>, settings: &Settings) -> Vec<PathBuf> {
    if roots.is_empty() {
        settings.default_roots.clone()
    } else {
        roots
    }
}
