use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use annotation_ledger::{
    check_progress, contributors_from_assignment, inspect_contributor,
    dataset::{self, SplitOptions},
    distribute::{self, PoolOptions, SetupOptions},
    mask, merge, ExtensionSet, LedgerError, WorkspaceConfig,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root folder holding one subtree per contributor
    #[arg(short, long, global = true, default_value = "annotation_workspace")]
    workspace: PathBuf,

    /// Contributor names, comma separated. Read-only commands fall back to
    /// the assignment file when omitted.
    #[arg(short, long, global = true, value_delimiter = ',')]
    contributors: Vec<String>,

    /// Recognized source image extensions, comma separated, case-sensitive
    #[arg(
        short,
        long,
        global = true,
        value_delimiter = ',',
        default_values = ["jpg", "jpeg", "png"]
    )]
    extensions: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the workspace folders without assigning anything
    Init,

    /// Split the source images across the team and prepare the workspace
    Setup {
        #[arg(short, long, default_value = "raw_images")]
        source: PathBuf,

        /// Also collect images from subfolders
        #[arg(short, long)]
        recursive: bool,

        /// Only collect files whose name starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Clear images left in assigned folders by an earlier setup
        #[arg(long)]
        force: bool,
    },

    /// Recompute progress from the workspace and write progress.json
    Progress {
        /// Print the report without touching progress.json
        #[arg(long)]
        no_write: bool,
    },

    /// List which assigned images of one contributor still lack a mask
    Inspect { contributor: String },

    /// Collect completed images and masks from every contributor
    Merge {
        #[arg(short, long, default_value = merge::DEFAULT_MERGE_DIR)]
        output: PathBuf,
    },

    /// Split merged image/mask pairs into train and validation sets
    Prepare {
        #[arg(short, long, default_value = merge::DEFAULT_MERGE_DIR)]
        source: PathBuf,

        #[arg(short, long, default_value = "final_dataset")]
        target: PathBuf,

        #[arg(long, default_value_t = 0.8)]
        train_split: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Check every mask against the single-channel 0/255 format
    CheckMasks {
        /// Rewrite offending masks thresholded at 127
        #[arg(long)]
        fix: bool,
    },
}

const NO_IMAGES: u8 = 3;

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<LedgerError>()
                .map_or(1, LedgerError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, LevelFilter::Warn)
        .filter(Some("annotation_ledger"), LevelFilter::Info);
    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    }
    builder.init();
}

fn extensions(cli: &Cli) -> Result<ExtensionSet> {
    Ok(ExtensionSet::new(&cli.extensions)?)
}

/// Builds the workspace configuration. Commands that create state need the
/// team on the command line; the others may take it from the assignment file.
fn workspace_config(cli: &Cli, creates_state: bool) -> Result<WorkspaceConfig> {
    let contributors = if !cli.contributors.is_empty() {
        cli.contributors.clone()
    } else if creates_state {
        return Err(LedgerError::invalid_configuration(
            "--contributors is required for this command",
        )
        .into());
    } else {
        contributors_from_assignment(&cli.workspace)?
    };

    Ok(WorkspaceConfig::new(
        &cli.workspace,
        contributors,
        extensions(cli)?,
    )?)
}

fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Init => {
            let config = workspace_config(&cli, true)?;
            config.layout().create(&config.contributors)?;
            println!("Workspace ready at {}", config.root.display());
        }
        Command::Setup {
            source,
            recursive,
            prefix,
            force,
        } => {
            let config = workspace_config(&cli, true)?;
            let options = SetupOptions {
                pool: PoolOptions {
                    recursive: *recursive,
                    prefix: prefix.clone(),
                },
                replace_existing: *force,
            };
            let summary = distribute::setup_workspace(&config, source, &options)
                .with_context(|| format!("setting up workspace from {}", source.display()))?;

            println!("Images distributed:");
            for contributor in &config.contributors {
                let count = summary
                    .assignment
                    .images_for(contributor)
                    .map_or(0, <[String]>::len);
                println!("  {contributor}: {count} images");
            }
            println!();
            println!("Workspace created at {}", config.root.display());
            println!("Each contributor paints the images in <name>/assigned/ and saves masks to <name>/masks/.");
        }
        Command::Progress { no_write } => {
            let config = workspace_config(&cli, false)?;
            let report = check_progress(&config)?;
            println!("{report}");

            if !no_write {
                report.write(&config.layout().progress_file())?;
            }
            if report.aggregate.total_assigned == 0 {
                eprintln!("No assigned images found in {}", config.root.display());
                return Ok(ExitCode::from(NO_IMAGES));
            }
        }
        Command::Inspect { contributor } => {
            let config = workspace_config(&cli, false)?;
            let inspection = inspect_contributor(&config, contributor)?;
            if inspection.assigned_missing {
                println!("{contributor}: no assigned folder found");
            }
            if inspection.masks_missing {
                println!("{contributor}: no masks folder found");
            }

            let reconciliation = &inspection.reconciliation;
            for base in &reconciliation.matched {
                println!("  done     {base}");
            }
            for base in &reconciliation.missing {
                println!("  missing  {base}");
            }
            for base in &reconciliation.orphaned {
                println!("  orphan   {base}.png (no assigned image)");
            }

            let progress = reconciliation.progress();
            println!();
            println!(
                "{contributor}: {}/{} completed, {} remaining",
                progress.completed, progress.total, progress.remaining
            );
        }
        Command::Merge { output } => {
            let config = workspace_config(&cli, false)?;
            let stats = merge::merge_annotations(&config, output)?;
            println!("Merged annotations into {}:", output.display());
            println!("  Total images: {}", stats.total_images);
            println!("  Total masks:  {}", stats.total_masks);
        }
        Command::Prepare {
            source,
            target,
            train_split,
            seed,
        } => {
            let options = SplitOptions {
                train_split: *train_split,
                seed: *seed,
            };
            let info = dataset::prepare_dataset(source, target, &extensions(&cli)?, &options)
                .with_context(|| format!("preparing dataset from {}", source.display()))?;
            println!("Dataset written to {}:", target.display());
            println!("  Train: {} images", info.train_images);
            println!("  Val:   {} images", info.val_images);
        }
        Command::CheckMasks { fix } => {
            let config = workspace_config(&cli, false)?;
            let report = mask::check_masks(&config, *fix)?;
            println!(
                "Checked {} masks: {} binary, {} flagged, {} fixed",
                report.checked,
                report.binary,
                report.flagged.len(),
                report.fixed
            );
            for entry in &report.flagged {
                println!("  {}/{}: {:?}", entry.contributor, entry.file_name, entry.verdict);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
