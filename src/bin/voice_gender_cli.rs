use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use voice_gender::{logging, AppConfig, BatchPrediction, GenderDetector};

#[derive(Parser, Debug)]
#[command(
    name = "voice-gender",
    about = "Train, query and retrain the speaker gender classifier"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base directory for relative artifact, feedback and log paths
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a model from a directory with one subdirectory per class
    Train {
        data_dir: PathBuf,
        /// Class subdirectory, repeatable, in label-id order
        #[arg(long = "class")]
        classes: Vec<String>,
    },
    /// Predict the class of one or more audio files
    Predict {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Record each prediction as presumed-correct feedback with a request id
        #[arg(long)]
        record: bool,
    },
    /// Submit a feedback sample
    Feedback {
        audio: PathBuf,
        #[arg(long)]
        predicted: u32,
        #[arg(long)]
        correct: u32,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Correct a recorded prediction by request id
    Correct {
        request_id: String,
        #[arg(long)]
        label: u32,
        #[arg(long)]
        user: Option<String>,
    },
    /// Retrain on accumulated feedback, optionally with the original data
    Retrain {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show feedback statistics
    Stats,
    /// Show model metadata and feedback statistics
    Info,
    /// Delete feedback for one class or for all classes
    Clear {
        #[arg(long)]
        class: Option<String>,
    },
    /// Stratified k-fold accuracy on a labelled directory
    CrossValidate {
        data_dir: PathBuf,
        #[arg(long, default_value_t = 5)]
        folds: usize,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    if let Some(root) = &cli.root {
        config = config.with_base_dir(root);
    }

    if let Err(err) = logging::init(&config.paths.log_dir) {
        eprintln!("Warning: file logging disabled: {err}");
    }

    let mut detector = GenderDetector::new(config).context("initializing detector")?;

    match cli.command {
        Commands::Train { data_dir, classes } => {
            let classes = (!classes.is_empty()).then_some(classes);
            let metrics = detector
                .train_initial_model(&data_dir, classes.as_deref())
                .with_context(|| format!("training from {}", data_dir.display()))?;
            emit(&metrics)?;
            Ok(ExitCode::from(0))
        }
        Commands::Predict { files, record } => run_predict(&mut detector, &files, record),
        Commands::Feedback {
            audio,
            predicted,
            correct,
            user,
            confidence,
        } => {
            let saved = detector
                .submit_feedback(&audio, predicted, correct, user.as_deref(), confidence)
                .with_context(|| format!("saving feedback for {}", audio.display()))?;
            emit(&serde_json::json!({ "saved_path": saved }))?;
            Ok(ExitCode::from(0))
        }
        Commands::Correct {
            request_id,
            label,
            user,
        } => {
            let updated = detector.correct_prediction(&request_id, label, user.as_deref())?;
            emit(&serde_json::json!({ "request_id": request_id, "updated": updated }))?;
            Ok(ExitCode::from(if updated { 0 } else { 2 }))
        }
        Commands::Retrain { data_dir } => {
            match detector.retrain_with_feedback(data_dir.as_deref())? {
                Some(metrics) => emit(&metrics)?,
                None => eprintln!("No feedback data available for retraining"),
            }
            Ok(ExitCode::from(0))
        }
        Commands::Stats => {
            emit(&detector.get_feedback_statistics()?)?;
            Ok(ExitCode::from(0))
        }
        Commands::Info => {
            emit(&detector.get_model_info()?)?;
            Ok(ExitCode::from(0))
        }
        Commands::Clear { class } => {
            detector.clear_feedback(class.as_deref())?;
            Ok(ExitCode::from(0))
        }
        Commands::CrossValidate { data_dir, folds } => {
            let cv = detector
                .cross_validate(&data_dir, folds)
                .with_context(|| format!("cross-validating on {}", data_dir.display()))?;
            emit(&cv)?;
            Ok(ExitCode::from(0))
        }
    }
}

fn run_predict(detector: &mut GenderDetector, files: &[PathBuf], record: bool) -> Result<ExitCode> {
    if record {
        let mut receipts = Vec::with_capacity(files.len());
        for file in files {
            let receipt = detector
                .predict_and_record(file)
                .with_context(|| format!("predicting {}", file.display()))?;
            receipts.push(receipt);
        }
        emit(&receipts)?;
        return Ok(ExitCode::from(0));
    }

    if let [file] = files {
        let prediction = detector
            .predict(file)
            .with_context(|| format!("predicting {}", file.display()))?;
        emit(&prediction)?;
        return Ok(ExitCode::from(0));
    }

    let results = detector.predict_batch(files);
    let failed = results
        .iter()
        .any(|result| matches!(result, BatchPrediction::Failed { .. }));
    emit(&results)?;
    Ok(ExitCode::from(if failed { 2 } else { 0 }))
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
