use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use datajanitor::ai::{CommandAssistant, CommandGenerator};
use datajanitor::analyser::filter::{FilterEngine, Operator};
use datajanitor::analyser::lifecycle::export::write_lineage_dir;
use datajanitor::analyser::logic::{Cleaner, CleaningOptions, load_df, save_df, upload_name};
use datajanitor::config::AppConfig;
use datajanitor::pipeline::{BatchReport, Session, batch_from_file, batch_to_file, batch_to_json, report_command};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "datajanitor",
    about = "Filter and clean tabular data with declarative JSON commands"
)]
pub struct Cli {
    /// Path to a JSON config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a batch of commands to a CSV file
    Apply {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// JSON file holding one command or an array of commands
        #[arg(short, long)]
        commands: PathBuf,

        /// Write every resulting version as CSV into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Write every resulting version into this zip archive
        #[arg(long)]
        zip: Option<PathBuf>,

        /// Print a report for each command result
        #[arg(long)]
        report: bool,
    },
    /// Run one filter specification and report the matching rows
    Filter {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Filter specification as JSON text
        #[arg(short, long)]
        filter: String,

        /// Save the matching rows as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Clean a CSV file and save the result
    Clean {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with cleaning options. Defaults to the configured preset.
        #[arg(long)]
        options: Option<PathBuf>,
    },
    /// Turn a free-text request into commands using the configured language model
    Ask {
        /// Input CSV file described to the model
        #[arg(short, long)]
        input: PathBuf,

        /// What you want done, in plain words
        request: String,

        /// Save the generated commands as JSON
        #[arg(long)]
        save: Option<PathBuf>,

        /// Apply the generated commands right away
        #[arg(long)]
        apply: bool,

        /// With --apply, write the resulting versions as CSV into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// List the supported filter operators
    Operators,
}

pub async fn run_command(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Apply {
            input,
            commands,
            out_dir,
            zip,
            report,
        } => handle_apply(&input, &commands, out_dir.as_deref(), zip.as_deref(), report, config),
        Commands::Filter {
            input,
            filter,
            output,
        } => handle_filter(&input, &filter, output.as_deref(), config),
        Commands::Clean {
            input,
            output,
            options,
        } => handle_clean(&input, &output, options.as_deref(), config),
        Commands::Ask {
            input,
            request,
            save,
            apply,
            out_dir,
        } => handle_ask(&input, &request, save.as_deref(), apply, out_dir.as_deref(), config).await,
        Commands::Operators => {
            for op in Operator::ALL {
                println!("{:<8} {}", op.as_str(), op.label());
            }
            Ok(())
        }
    }
}

fn open_session(input: &Path, config: &AppConfig) -> Result<Session> {
    let df = load_df(input).context("Failed to load input file")?;
    let mut session = Session::from_config(config);
    session.load_data(upload_name(input), df);
    Ok(session)
}

fn print_batch(report: &BatchReport, with_reports: bool) {
    for entry in &report.entries {
        match &entry.result {
            Ok(version) => println!("[{}] {} ({} rows)", entry.index, version, entry.count),
            Err(e) => println!("[{}] {e}", entry.index),
        }
        if with_reports {
            println!("{}", entry.report());
        }
    }
    println!("{}", report.summary());
}

fn write_outputs(session: &Session, out_dir: Option<&Path>, zip: Option<&Path>) -> Result<()> {
    if let Some(dir) = out_dir {
        let paths = write_lineage_dir(session.store().active_lineage()?, dir)?;
        println!("Wrote {} files to {}", paths.len(), dir.display());
    }
    if let Some(path) = zip {
        std::fs::write(path, session.export_lineage()?)
            .with_context(|| format!("Failed to write archive: {}", path.display()))?;
        println!("Wrote archive {}", path.display());
    }
    Ok(())
}

fn handle_apply(
    input: &Path,
    commands: &Path,
    out_dir: Option<&Path>,
    zip: Option<&Path>,
    with_reports: bool,
    config: &AppConfig,
) -> Result<()> {
    let mut session = open_session(input, config)?;
    let commands = batch_from_file(commands)?;
    println!("Applying {} command(s) to {}...", commands.len(), input.display());

    let report = session.apply_commands(&commands)?;
    print_batch(&report, with_reports);
    write_outputs(&session, out_dir, zip)
}

fn handle_filter(input: &Path, filter: &str, output: Option<&Path>, config: &AppConfig) -> Result<()> {
    let df = load_df(input).context("Failed to load input file")?;
    let spec: serde_json::Value =
        serde_json::from_str(filter).context("Filter is not valid JSON")?;

    let engine = FilterEngine::new(config.filter.date_fallback);
    let (mut filtered, count) = engine.apply(&df, &spec)?;
    println!("{}", report_command(&filtered, count));

    if let Some(path) = output {
        save_df(&mut filtered, path)?;
        println!("Saved {count} rows to {}", path.display());
    }
    Ok(())
}

fn handle_clean(
    input: &Path,
    output: &Path,
    options: Option<&Path>,
    config: &AppConfig,
) -> Result<()> {
    let df = load_df(input).context("Failed to load input file")?;
    let options: CleaningOptions = match options {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file: {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse cleaning options")?
        }
        None => config.cleaning_defaults.clone(),
    };

    println!("Cleaning {}...", input.display());
    let mut outcome = Cleaner::default().clean(&df, &options)?;
    for warning in &outcome.warnings {
        println!("Warning: {warning}");
    }
    save_df(&mut outcome.frame, output)?;
    println!(
        "Saved {} rows x {} columns to {}",
        outcome.frame.height(),
        outcome.frame.width(),
        output.display()
    );
    Ok(())
}

async fn handle_ask(
    input: &Path,
    request: &str,
    save: Option<&Path>,
    apply: bool,
    out_dir: Option<&Path>,
    config: &AppConfig,
) -> Result<()> {
    let mut session = open_session(input, config)?;
    let assistant = CommandAssistant::from_config(&config.llm)?;
    let generator = CommandGenerator::new(assistant, config.default_filename.clone());

    let frame = session.current_frame()?;
    let commands = generator.generate(request, Some(&*frame)).await?;
    println!("{}", batch_to_json(&commands)?);

    if let Some(path) = save {
        batch_to_file(&commands, path)?;
        println!("Saved commands to {}", path.display());
    }

    if apply {
        let report = session.apply_commands(&commands)?;
        print_batch(&report, false);
        write_outputs(&session, out_dir, None)?;
    }
    Ok(())
}
