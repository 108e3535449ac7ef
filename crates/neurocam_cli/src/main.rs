//! neurocam CLI: classify brain MRI scans and explain the prediction.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use neurocam_infer::{encode_png, Analyzer, ClassLabels, InferenceConfig};
use neurocam_models::{load_model, save_model, CheckpointMetadata, ResNetConfig};

/// Backend type for saliency (gradients required).
type ExplainBackend = Autodiff<NdArray>;

/// Metadata key holding the training-time input normalization as JSON.
const NORMALIZATION_KEY: &str = "normalization";

#[derive(Parser)]
#[command(name = "neurocam")]
#[command(author, version)]
#[command(about = "Brain MRI classification with Grad-CAM++ explanations")]
#[command(long_about = "neurocam: classify a brain MRI scan and show which regions drove the decision.

EXAMPLES:
  # Write a randomly initialized checkpoint for a smoke run
  neurocam init --output ./model --arch tiny

  # Explain a scan with a checkpoint
  neurocam explain --image scan.png --checkpoint ./model/model.mpk

  # Explain a specific class instead of the prediction
  neurocam explain --image scan.png --checkpoint ./model/model.mpk --class 2

  # List the layers that can be instrumented
  neurocam layers --arch resnet18

ARCHITECTURES:
  resnet18 - ResNet-18 at 224x224 [default]
  resnet34 - ResNet-34 at 224x224
  tiny     - 4-stage toy network at 64x64")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an image and write heatmap and bounding-box overlays
    Explain {
        /// Path to the MRI image (PNG or JPEG)
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Model weights (.mpk); the metadata sidecar (.json) is read if present
        #[arg(long, value_name = "PATH")]
        checkpoint: Option<PathBuf>,

        /// Inference configuration (JSON)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Architecture when no metadata sidecar is available
        #[arg(long, default_value = "resnet18", value_name = "ARCH")]
        arch: String,

        /// Explain this class index instead of the prediction
        #[arg(long, value_name = "INDEX")]
        class: Option<usize>,

        /// Output directory
        #[arg(long, default_value = ".", value_name = "DIR")]
        output: PathBuf,
    },
    /// List the observable layers of an architecture
    Layers {
        /// Model architecture: resnet18, resnet34, tiny
        #[arg(long, default_value = "resnet18", value_name = "ARCH")]
        arch: String,

        /// Number of output logits
        #[arg(long, default_value = "4", value_name = "N")]
        n_classes: usize,
    },
    /// Write a randomly initialized checkpoint and its metadata
    Init {
        /// Output directory
        #[arg(long, value_name = "DIR")]
        output: PathBuf,

        /// Model architecture: resnet18, resnet34, tiny
        #[arg(long, default_value = "resnet18", value_name = "ARCH")]
        arch: String,

        /// Single-logit tumor / no-tumor classifier
        #[arg(long, default_value = "false")]
        binary: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Explain {
            image,
            checkpoint,
            config,
            arch,
            class,
            output,
        } => handle_explain(&image, checkpoint.as_deref(), config.as_deref(), &arch, class, &output),
        Commands::Layers { arch, n_classes } => handle_layers(&arch, n_classes),
        Commands::Init {
            output,
            arch,
            binary,
        } => handle_init(&output, &arch, binary),
    }
}

fn parse_arch(arch: &str, n_classes: usize) -> Result<ResNetConfig> {
    match arch.to_lowercase().as_str() {
        "resnet18" | "resnet" => Ok(ResNetConfig::resnet18(n_classes)),
        "resnet34" => Ok(ResNetConfig::resnet34(n_classes)),
        "tiny" => Ok(ResNetConfig::tiny(n_classes)),
        _ => bail!(
            "Unknown architecture: '{}'. Available: resnet18, resnet34, tiny",
            arch
        ),
    }
}

/// Labels recorded in checkpoint metadata, if they fit the model.
fn labels_from_metadata(metadata: &CheckpointMetadata, n_classes: usize) -> Option<ClassLabels> {
    match (n_classes, metadata.labels.as_slice()) {
        (1, [negative, positive]) => Some(ClassLabels::Binary {
            positive: positive.clone(),
            negative: negative.clone(),
        }),
        (n, labels) if n > 1 && labels.len() == n => Some(ClassLabels::MultiClass(labels.to_vec())),
        _ => None,
    }
}

/// Inference settings for a checkpoint when no config file is given.
///
/// Single-logit models start from the binary preset, whose inputs are mapped
/// to `[-1, 1]`. Labels and a normalization recorded in the metadata take
/// precedence over the preset.
fn inference_config_for(
    model_config: &ResNetConfig,
    metadata: Option<&CheckpointMetadata>,
) -> Result<InferenceConfig> {
    let mut config = if model_config.n_classes == 1 {
        InferenceConfig::binary()
    } else {
        InferenceConfig::default()
    };

    if let Some(metadata) = metadata {
        if let Some(labels) = labels_from_metadata(metadata, model_config.n_classes) {
            config.labels = labels;
        }
        if let Some(json) = metadata.extra.get(NORMALIZATION_KEY) {
            config.normalization = serde_json::from_str(json)
                .context("Invalid normalization in checkpoint metadata")?;
        }
    }

    config.saliency.target_layer = model_config.default_target_layer();
    Ok(config)
}

fn handle_explain(
    image_path: &Path,
    checkpoint: Option<&Path>,
    config_path: Option<&Path>,
    arch: &str,
    class: Option<usize>,
    output: &Path,
) -> Result<()> {
    let device = Default::default();

    let metadata = match checkpoint {
        Some(path) if path.with_extension("json").exists() => Some(
            CheckpointMetadata::load(path.with_extension("json"))
                .context("Failed to read checkpoint metadata")?,
        ),
        _ => None,
    };

    let file_config = match config_path {
        Some(path) => Some(
            InferenceConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        ),
        None => None,
    };

    let model_config = match &metadata {
        Some(metadata) => metadata
            .config::<ResNetConfig>()
            .context("Checkpoint metadata has no ResNet configuration")?,
        None => {
            let n_logits = file_config
                .as_ref()
                .map_or_else(|| ClassLabels::default().n_logits(), |c| c.labels.n_logits());
            parse_arch(arch, n_logits)?
        }
    };

    let config = match file_config {
        Some(config) => config,
        None => inference_config_for(&model_config, metadata.as_ref())?,
    };

    let model = model_config.init::<ExplainBackend>(&device);
    let model = match checkpoint {
        Some(path) => load_model(model, path, &device)
            .with_context(|| format!("Failed to load checkpoint '{}'", path.display()))?,
        None => {
            tracing::warn!("no checkpoint given; explaining a randomly initialized network");
            model
        }
    };

    println!("=== neurocam explain ===\n");
    println!("  Image: {}", image_path.display());
    println!("  Input: {}", model.input_shape());
    println!("  Target layer: {}", config.saliency.target_layer);
    println!("  Method: {:?}\n", config.saliency.method);

    let bytes = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image '{}'", image_path.display()))?;
    let analyzer = Analyzer::new(model, config, device).context("Invalid configuration")?;
    let analysis = analyzer
        .analyze_bytes_with_class(&bytes, class)
        .context("Analysis failed")?;

    println!("Prediction: {}", analysis.prediction.label);
    println!("Confidence: {:.2}%", analysis.prediction.confidence * 100.0);
    for (label, p) in &analysis.prediction.probabilities {
        println!("  {:<24} {:.4}", label, p);
    }
    println!("Explained class: {}", analysis.saliency.target_class());
    match analysis.overlays.region {
        Some(region) => println!(
            "Region: x={} y={} w={} h={}",
            region.x, region.y, region.width, region.height
        ),
        None => println!("Region: none above threshold"),
    }

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create '{}'", output.display()))?;
    let heatmap_path = output.join("cam_heatmap.png");
    let boxed_path = output.join("cam_bounding_box.png");
    let report_path = output.join("analysis.json");

    std::fs::write(&heatmap_path, encode_png(&analysis.overlays.heatmap)?)?;
    std::fs::write(&boxed_path, encode_png(&analysis.overlays.bounding_box)?)?;
    let payload = analysis.to_payload()?;
    std::fs::write(&report_path, serde_json::to_string_pretty(&payload)?)?;

    println!("\nSaved:");
    println!("  {}", heatmap_path.display());
    println!("  {}", boxed_path.display());
    println!("  {}", report_path.display());
    Ok(())
}

fn handle_layers(arch: &str, n_classes: usize) -> Result<()> {
    let config = parse_arch(arch, n_classes)?;
    let target = config.default_target_layer();

    println!("Observable layers ({}):", arch);
    for name in config.observable_layers() {
        let marker = if name == target { "  <- default target" } else { "" };
        println!("  {}{}", name, marker);
    }
    Ok(())
}

fn handle_init(output: &Path, arch: &str, binary: bool) -> Result<()> {
    let preset = if binary {
        InferenceConfig::binary()
    } else {
        InferenceConfig::default()
    };
    let config = parse_arch(arch, preset.labels.n_logits())?;
    let label_names: Vec<String> = match &preset.labels {
        ClassLabels::Binary { positive, negative } => vec![negative.clone(), positive.clone()],
        ClassLabels::MultiClass(names) => names.clone(),
    };

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create '{}'", output.display()))?;
    let weights_path = output.join("model.mpk");

    let device = Default::default();
    let model = config.init::<NdArray>(&device);
    save_model(&model, &weights_path).context("Failed to save weights")?;

    CheckpointMetadata::new(arch)
        .with_config(&config)?
        .with_labels(label_names)
        .with_extra("initialization", "random")
        .with_extra(NORMALIZATION_KEY, serde_json::to_string(&preset.normalization)?)
        .save(weights_path.with_extension("json"))
        .context("Failed to save metadata")?;

    println!("Wrote {} ({} logits)", weights_path.display(), config.n_classes);
    println!("Wrote {}", weights_path.with_extension("json").display());
    Ok(())
}
