use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine_ear::analysis::{MelSpectrogram, SymphoniaLoader};
use engine_ear::diagnostic::config::DEFAULT_HISTORY_FILE;
use engine_ear::history::AnalysisHistoryStore;
use engine_ear::model::{AnalysisRecord, EngineType};
use engine_ear::{DiagnosticConfig, DiagnosticError, DiagnosticService};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions picked up when analyzing a directory
const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac"];

#[derive(Parser, Debug)]
#[command(name = "engine-ear")]
#[command(about = "Diagnose engine health from recorded engine sound", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the analysis history file
    #[arg(long, global = true, default_value = DEFAULT_HISTORY_FILE)]
    history: String,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze an audio file, or every audio file under a directory
    Analyze {
        /// Audio file or directory
        input: PathBuf,

        /// Engine type (gasoline, diesel; other values use default thresholds)
        #[arg(short = 'e', long, default_value = "gasoline")]
        engine: String,

        /// Write the mel spectrogram of the last analysis as JSON
        #[arg(long)]
        spectrogram_out: Option<PathBuf>,

        /// Print records as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Only decode the first N seconds of each file
        #[arg(long)]
        max_seconds: Option<f32>,
    },

    /// Show the most recent analyses
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        recent: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let history_path = PathBuf::from(shellexpand::tilde(&args.history).as_ref());

    match args.command {
        Command::Analyze {
            input,
            engine,
            spectrogram_out,
            json,
            max_seconds,
        } => {
            let mut loader = SymphoniaLoader::new();
            if let Some(secs) = max_seconds {
                loader = loader.with_max_duration(secs);
            }
            let engine = EngineType::from_tag(&engine);
            analyze(&input, engine, history_path, loader, spectrogram_out, json)
        }
        Command::History { recent } => show_history(&history_path, recent),
    }
}

fn analyze(
    input: &Path,
    engine: EngineType,
    history_path: PathBuf,
    loader: SymphoniaLoader,
    spectrogram_out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let sources = collect_sources(input)?;
    if sources.is_empty() {
        anyhow::bail!("No audio files found under {:?}", input);
    }

    let config = DiagnosticConfig::new(history_path);
    let mut service = DiagnosticService::new(config, loader)?;

    log::info!("Analyzing {} file(s) as {}", sources.len(), engine);

    for (i, source) in sources.iter().enumerate() {
        if sources.len() > 1 {
            log::info!("[{}/{}] {:?}", i + 1, sources.len(), source);
        }

        let diagnosis = match service.run_analysis(source, engine.clone()) {
            Ok(diagnosis) => diagnosis,
            Err(e) => {
                // The analysis itself succeeded; show it before failing
                if let Some(record) = e.unsaved_record() {
                    print_record(record, json)?;
                    log::error!("Result was NOT saved to history");
                }
                if let (Some(spectrogram), Some(out)) =
                    (e.unsaved_spectrogram(), spectrogram_out.as_deref())
                {
                    write_spectrogram(spectrogram, out)?;
                }
                return Err(e).with_context(|| format!("Failed to analyze {:?}", source));
            }
        };

        print_record(&diagnosis.record, json)?;

        if let Some(ref out) = spectrogram_out {
            write_spectrogram(&diagnosis.spectrogram, out)?;
        }
    }

    Ok(())
}

fn write_spectrogram(spectrogram: &MelSpectrogram, out: &Path) -> Result<()> {
    let data = serde_json::to_vec(spectrogram)?;
    std::fs::write(out, data).with_context(|| format!("Failed to write spectrogram: {:?}", out))?;
    log::info!("Spectrogram written to {:?}", out);
    Ok(())
}

fn show_history(history_path: &Path, recent: usize) -> Result<()> {
    let store = match AnalysisHistoryStore::open(history_path) {
        Ok(store) => store,
        Err(e @ DiagnosticError::CorruptHistory { .. }) => {
            log::error!("History file is unreadable; it was left untouched for inspection");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if store.is_empty() {
        println!("No analyses recorded yet.");
        return Ok(());
    }

    for record in store.recent(recent) {
        println!("{}", record.summary_line());
    }

    Ok(())
}

/// A single file, or every audio file under a directory in sorted order
fn collect_sources(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", input))?;
        if entry.file_type().is_file() && is_audio_file(entry.path()) {
            sources.push(entry.into_path());
        }
    }

    Ok(sources)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn print_record(record: &AnalysisRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        for (key, value) in record.fields() {
            println!("{:<18}: {}", key, value);
        }
        println!();
    }
    Ok(())
}
