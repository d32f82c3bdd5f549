use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use simple_captcha::{
    CaptchaBuilder, DEFAULT_MAX_OCR_ATTEMPTS, DEFAULT_QUALITY, EffectConfig, OcrEvaluator,
    OutputFormat,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simple-captcha", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a captcha and write it to a file (format from the extension).
    Generate(GenerateArgs),
    /// Build a captcha and print it as a data URI.
    Inline(InlineArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Image width in pixels.
    #[arg(long, default_value_t = 150)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 40)]
    height: u32,

    /// Phrase to render; random when omitted.
    #[arg(long)]
    phrase: Option<String>,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Encoder quality (0-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    quality: u8,

    /// Effect configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rebuild until neither ocrad nor tesseract can read the phrase.
    #[arg(long, default_value_t = false)]
    against_ocr: bool,

    /// Attempt cap for `--against-ocr`.
    #[arg(long, default_value_t = DEFAULT_MAX_OCR_ATTEMPTS)]
    max_attempts: u32,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Output image path (.jpg, .jpeg, .png or .gif).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InlineArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Output format.
    #[arg(long, default_value = "jpg")]
    format: OutputFormat,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Inline(args) => cmd_inline(args),
    }
}

fn build(args: &BuildArgs) -> anyhow::Result<CaptchaBuilder> {
    let config = match &args.config {
        Some(path) => EffectConfig::from_json_file(path)?,
        None => EffectConfig::default(),
    };
    let phrase = args.phrase.as_deref();
    let builder = match args.seed {
        Some(seed) => CaptchaBuilder::with_seed(phrase, seed)?,
        None => CaptchaBuilder::new(phrase)?,
    };
    let mut builder = builder.with_config(config)?;

    if args.against_ocr {
        let evaluator = OcrEvaluator::detect();
        builder.build_against_ocr(args.width, args.height, &evaluator, args.max_attempts)?;
    } else {
        builder.build(args.width, args.height)?;
    }
    Ok(builder)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let format = OutputFormat::from_path(&args.out)?;
    let builder = build(&args.build)?;
    builder.save(&args.out, args.build.quality)?;
    eprintln!("wrote {} ({format})", args.out.display());
    println!("{}", builder.phrase());
    Ok(())
}

fn cmd_inline(args: InlineArgs) -> anyhow::Result<()> {
    let builder = build(&args.build)?;
    let uri = builder.inline(args.build.quality, args.format)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{uri}").context("write data uri")?;
    eprintln!("phrase: {}", builder.phrase());
    Ok(())
}
