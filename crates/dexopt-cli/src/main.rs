use anyhow::Context;
use clap::Parser;
use dexopt_core::{
    read_image, write_image, DexProgram, OptimizerConfig, PassContext, PassManager, PassReport,
    PgoInput,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "dexopt.yaml";

/// dexopt - whole-program optimizer for dex application images
#[derive(Parser, Debug)]
#[command(name = "dexopt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Application image to optimize (JSON)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Where to write the optimized image; nothing is written when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to a dexopt.yaml / dexopt.json configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the iteration cap of the single-implementation pass
    #[arg(long, value_name = "N")]
    max_cycles: Option<usize>,

    /// JSON profile handed to every pass
    #[arg(long, value_name = "FILE")]
    pgo: Option<PathBuf>,

    /// Print the optimized classes
    #[arg(long)]
    dump: bool,

    /// Write a default dexopt.yaml into the current directory
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug to see every candidate verdict
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_config()?;
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        eprintln!("Error: No input image specified. Use --help for usage information.");
        std::process::exit(1);
    };

    let config = load_config(&cli)?;
    let ctx = PassContext::new(load_pgo(&cli, &config)?);

    let mut program = read_image(input)
        .with_context(|| format!("Failed to load image {}", input.display()))?;
    info!(
        "Loaded {} class(es) in {} container(s) from {}",
        program.class_count(),
        program.dexen.len(),
        input.display()
    );

    let mut manager = PassManager::from_config(&config);
    debug!("Passes: {:?}", manager.pass_names());
    let reports = manager
        .run(&mut program, &ctx)
        .context("Optimization failed")?;

    for report in &reports {
        println!("{}", summary_line(report));
    }

    if cli.dump {
        print_dump(&program);
    }

    if let Some(output) = &cli.output {
        write_image(&program, output)
            .with_context(|| format!("Failed to write image {}", output.display()))?;
        info!("Wrote {} class(es) to {}", program.class_count(), output.display());
    }

    Ok(())
}

fn init_config() -> anyhow::Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    OptimizerConfig::init_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Explicit --config, else dexopt.yaml in the current directory, else defaults
fn load_config(cli: &Cli) -> anyhow::Result<OptimizerConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match path {
        Some(path) => {
            info!("Using configuration {}", path.display());
            OptimizerConfig::from_file(&path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => OptimizerConfig::default(),
    };

    if let Some(max_cycles) = cli.max_cycles {
        anyhow::ensure!(max_cycles > 0, "--max-cycles must be at least 1");
        config.single_impl.max_cycles = max_cycles;
    }
    Ok(config)
}

fn load_pgo(cli: &Cli, config: &OptimizerConfig) -> anyhow::Result<PgoInput> {
    let Some(path) = &cli.pgo else {
        return Ok(config.pgo.clone());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid profile {}", path.display()))?;
    Ok(PgoInput(value))
}

fn summary_line(report: &PassReport) -> String {
    let metrics: Vec<String> = report
        .metrics
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    format!("{}: {}", report.pass, metrics.join(" "))
}

fn print_dump(program: &DexProgram) {
    for class in program.classes() {
        println!("{}", class.dump(&program.types));
    }
}
