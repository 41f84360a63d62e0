//! irisvm command line interface
//!
//! Trains the iris ensemble, serves predictions over HTTP, and inspects or
//! queries saved artifacts.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use irisvm::core::{ClassifierError, Dataset, ProbabilisticClassifier, Result, Species};
use irisvm::metrics::{ClassificationReport, ConfusionMatrix};
use irisvm::persistence::{load_classifier, load_scaler, print_summary};
use irisvm::service::{self, AppContext, ArtifactPaths, LoadedModel, ServiceSettings};
use irisvm::{CsvDataset, Trainer, TrainerConfig, FEATURE_NAMES};
use log::{error, info};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "irisvm")]
#[command(about = "Iris species classifier: SVM + gradient boosting ensemble")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "irisvm contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the ensemble and write model.json and scaler.json
    Train(TrainArgs),
    /// Run the HTTP prediction service
    Serve(ServeArgs),
    /// Classify one flower from its four measurements
    Predict(PredictArgs),
    /// Evaluate saved artifacts on a labeled CSV file
    Evaluate(EvaluateArgs),
    /// Display artifact information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Directory receiving the artifacts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Labeled CSV file (bundled iris data when omitted)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Seed for the split, folds and calibration
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Cross-validation folds for the grid search
    #[arg(long, default_value_t = 5)]
    cv_folds: usize,

    /// Fraction of each class held out for testing
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Also search polynomial kernels
    #[arg(long)]
    with_poly: bool,
}

#[derive(Args)]
struct ArtifactArgs {
    /// Classifier artifact
    #[arg(short, long, env = "IRISVM_MODEL", default_value = "model.json")]
    model: PathBuf,

    /// Scaler artifact
    #[arg(short, long, env = "IRISVM_SCALER", default_value = "scaler.json")]
    scaler: PathBuf,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "IRISVM_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// Exclusive lower bound for every measurement (cm)
    #[arg(long, default_value_t = 0.0)]
    min_feature: f64,

    /// Inclusive upper bound for every measurement (cm)
    #[arg(long, default_value_t = 20.0)]
    max_feature: f64,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// Sepal length (cm)
    sepal_length: f64,
    /// Sepal width (cm)
    sepal_width: f64,
    /// Petal length (cm)
    petal_length: f64,
    /// Petal width (cm)
    petal_width: f64,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// Labeled CSV file
    #[arg(long)]
    data: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// Artifact file (model or scaler)
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Serve(args) => serve_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let trainer = Trainer::new(TrainerConfig {
        data_path: args.data,
        output_dir: args.output_dir,
        seed: args.seed,
        cv_folds: args.cv_folds,
        test_size: args.test_size,
        with_poly: args.with_poly,
    });
    let report = trainer.run()?;

    let params = &report.params;
    println!("=== MODEL EVALUATION ===");
    println!("Best SVM params: C={}, gamma={}, kernel={}", params.c, params.gamma, params.kernel);
    println!("CV accuracy: {:.4}", params.cv_score);
    println!("Accuracy: {:.4}", params.test_accuracy);
    println!("\nConfusion Matrix:\n{}", report.confusion);
    println!("Classification Report:\n{}", report.report);
    println!("Model saved to {}", report.model_path.display());
    println!("Scaler saved to {}", report.scaler_path.display());
    Ok(())
}

fn serve_command(args: ServeArgs) -> Result<()> {
    if !(args.min_feature < args.max_feature) {
        return Err(ClassifierError::InvalidParameter(format!(
            "min-feature ({}) must be below max-feature ({})",
            args.min_feature, args.max_feature
        )));
    }
    let settings = ServiceSettings {
        min_feature: args.min_feature,
        max_feature: args.max_feature,
    };
    let paths = ArtifactPaths::new(args.artifacts.model, args.artifacts.scaler);
    let ctx = Arc::new(AppContext::load(&paths, settings));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(service::run_server(args.bind, ctx))
}

fn load_artifacts(args: &ArtifactArgs) -> Result<LoadedModel> {
    info!("Loading model from {:?}", args.model);
    let payload = load_classifier(&args.model)?;
    info!("Loading scaler from {:?}", args.scaler);
    let scaler = load_scaler(&args.scaler)?;
    LoadedModel::new(scaler, payload.model)
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let loaded = load_artifacts(&args.artifacts)?;
    let settings = ServiceSettings::default();
    let features = [
        settings.check("sepal_length", args.sepal_length)?,
        settings.check("sepal_width", args.sepal_width)?,
        settings.check("petal_length", args.petal_length)?,
        settings.check("petal_width", args.petal_width)?,
    ];

    let prediction = loaded.predict(&features)?;
    println!("Predicted species: {}", prediction.species()?);
    println!("Confidence: {:.4}", prediction.confidence());
    println!("Probabilities:");
    for (species, p) in Species::ALL.iter().zip(&prediction.probabilities) {
        println!("  {species}: {p:.4}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let loaded = load_artifacts(&args.artifacts)?;
    let dataset = CsvDataset::from_file(&args.data)?;
    info!("Evaluating on {} samples from {:?}", dataset.len(), args.data);

    let y_true = dataset.labels();
    let y_pred = dataset
        .as_samples()
        .iter()
        .map(|s| {
            let scaled = loaded.scaler().transform(&s.features)?;
            Ok(loaded.model().predict(&scaled))
        })
        .collect::<Result<Vec<usize>>>()?;

    let names: Vec<&str> = Species::ALL.iter().map(|s| s.name()).collect();
    let report = ClassificationReport::new(&y_true, &y_pred, &names);
    println!("=== Model Evaluation ===");
    println!("Features: {}", FEATURE_NAMES.join(", "));
    println!("Accuracy: {:.4}", report.accuracy);
    println!(
        "\nConfusion Matrix:\n{}",
        ConfusionMatrix::new(&y_true, &y_pred, names.len())
    );
    println!("Classification Report:\n{report}");
    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Reading artifact {:?}", args.path);
    print_summary(&args.path)
}
