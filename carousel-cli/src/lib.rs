//! # Carousel CLI
//!
//! Command line front end: composite a generated plan into static PNGs,
//! export an edited deck, or list the built-in stickers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use carousel_core::{stickers, EditorSession, EngineOutput, ImageSet, SeedPolicy, SlideDeck};
use carousel_renderer::{
    Compositor, CompositorConfig, DirectorySink, ExportConfig, ExportPipeline, ExportReport, Rasterizer,
    SlideExporter,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "carousel", version, about = "Render five-slide carousel posts")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub cmd: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Composite plan pages over their generated images.
    Composite(CompositeArgs),
    /// Render editable slides at export resolution.
    Export(ExportArgs),
    /// List the built-in stickers.
    Stickers,
}

/// Font options shared by every rendering command.
#[derive(Args, Debug, Clone, Default)]
pub struct FontArgs {
    /// Extra directory of font files (repeatable).
    #[arg(long = "font-dir")]
    pub font_dirs: Vec<PathBuf>,

    /// Font family used for all text.
    #[arg(long)]
    pub font_family: Option<String>,
}

impl FontArgs {
    fn rasterizer(&self) -> Rasterizer {
        let rasterizer = if self.font_dirs.is_empty() {
            Rasterizer::new()
        } else {
            Rasterizer::with_font_dirs(&self.font_dirs)
        };
        match &self.font_family {
            Some(family) => rasterizer.with_font_family(family.clone()),
            None => rasterizer,
        }
    }
}

/// Arguments for `carousel composite`.
#[derive(Args, Debug)]
pub struct CompositeArgs {
    /// Plan envelope JSON from the content engine.
    #[arg(long)]
    pub plan: PathBuf,

    /// Image envelope JSON from the content engine.
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub out: PathBuf,

    /// Compositor configuration JSON; flags override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Watermark handle drawn top right.
    #[arg(long, env = "CAROUSEL_WATERMARK")]
    pub watermark: Option<String>,

    /// Pause between written files, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub throttle_ms: u64,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub fonts: FontArgs,
}

/// How slides are seeded when no saved deck is given.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    /// Slides start without layers.
    Empty,
    /// Each slide gets a label and a body text layer.
    #[default]
    PageText,
}

impl From<Seed> for SeedPolicy {
    fn from(seed: Seed) -> Self {
        match seed {
            Seed::Empty => Self::Empty,
            Seed::PageText => Self::PageText,
        }
    }
}

/// Arguments for `carousel export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Plan envelope JSON from the content engine.
    #[arg(long)]
    pub plan: PathBuf,

    /// Saved deck JSON; replaces the seeded slides.
    #[arg(long)]
    pub deck: Option<PathBuf>,

    /// Image envelope JSON applied as slide backgrounds.
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub out: PathBuf,

    /// Layers seeded onto each slide.
    #[arg(long, value_enum, default_value_t = Seed::PageText)]
    pub seed: Seed,

    /// Supersampling factor.
    #[arg(long, env = "CAROUSEL_SCALE", default_value_t = 2.0)]
    pub scale: f32,

    /// Pause between written files, in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub throttle_ms: u64,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub fonts: FontArgs,
}

/// Run a parsed command line.
///
/// # Errors
///
/// Returns an error if inputs cannot be read or any slide fails to render.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.cmd {
        Command::Composite(args) => composite(args).await,
        Command::Export(args) => export(&args).await,
        Command::Stickers => {
            print!("{}", sticker_listing());
            Ok(())
        }
    }
}

/// One `id<TAB>name` line per built-in sticker.
#[must_use]
pub fn sticker_listing() -> String {
    stickers::catalog()
        .iter()
        .map(|s| format!("{}\t{}\n", s.id, s.name))
        .collect()
}

async fn read_envelope(path: &Path) -> anyhow::Result<EngineOutput> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read '{}'", path.display()))?;
    EngineOutput::from_json(&json).with_context(|| format!("parse '{}'", path.display()))
}

async fn read_compositor_config(path: &Path) -> anyhow::Result<CompositorConfig> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parse '{}'", path.display()))
}

async fn read_images(path: Option<&Path>) -> anyhow::Result<ImageSet> {
    match path {
        Some(path) => Ok(read_envelope(path).await?.image_set()?),
        None => Ok(ImageSet::new()),
    }
}

async fn composite(args: CompositeArgs) -> anyhow::Result<()> {
    let plan = read_envelope(&args.plan).await?.plan()?;
    let images = read_images(args.images.as_deref()).await?;
    tracing::info!(pages = plan.pages().len(), images = images.len(), "compositing plan");

    let mut config = match &args.config {
        Some(path) => read_compositor_config(path).await?,
        None => CompositorConfig::default(),
    };
    if let Some(watermark) = args.watermark {
        config.watermark = watermark;
    }
    if let Some(family) = &args.fonts.font_family {
        config.font_family.clone_from(family);
    }
    let rasterizer = args.fonts.rasterizer().with_font_family(config.font_family.clone());
    let compositor = Compositor::new(config, rasterizer.clone());
    let exporter = SlideExporter::new(
        ExportConfig {
            scale: 1.0,
            settle_delay_ms: 0,
            throttle_ms: args.throttle_ms,
        },
        rasterizer,
    );
    let pipeline = ExportPipeline::new(exporter, Arc::new(DirectorySink::new(&args.out)));

    let report = pipeline.composite_all(&compositor, &plan, &images).await;
    finish(&report, &args.out)
}

async fn export(args: &ExportArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.scale > 0.0, "scale must be positive, got {}", args.scale);

    let plan = read_envelope(&args.plan).await?.plan()?;
    let mut session = EditorSession::from_plan(plan, args.seed.into());

    if let Some(path) = &args.deck {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read '{}'", path.display()))?;
        session.deck = SlideDeck::from_json(&json).with_context(|| format!("parse '{}'", path.display()))?;
    }

    let images = read_images(args.images.as_deref()).await?;
    let applied = session.apply_images(&images);
    tracing::info!(slides = session.deck.len(), backgrounds = applied, "exporting deck");

    let exporter = SlideExporter::new(
        ExportConfig {
            scale: args.scale,
            settle_delay_ms: 0,
            throttle_ms: args.throttle_ms,
        },
        args.fonts.rasterizer(),
    );
    let pipeline = ExportPipeline::new(exporter, Arc::new(DirectorySink::new(&args.out)));

    let report = pipeline.export_all(&mut session).await;
    finish(&report, &args.out)
}

fn finish(report: &ExportReport, out: &Path) -> anyhow::Result<()> {
    for filename in &report.delivered {
        eprintln!("wrote {}", out.join(filename).display());
    }
    for (index, error) in &report.failed {
        eprintln!("slide {} failed: {error}", index + 1);
    }
    anyhow::ensure!(
        report.is_complete(),
        "{} of {} slides failed",
        report.failed.len(),
        report.failed.len() + report.delivered.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_maps_to_policy() {
        assert_eq!(SeedPolicy::from(Seed::Empty), SeedPolicy::Empty);
        assert_eq!(SeedPolicy::from(Seed::PageText), SeedPolicy::PageText);
    }

    #[test]
    fn test_sticker_listing_has_one_line_per_sticker() {
        let listing = sticker_listing();
        assert_eq!(listing.lines().count(), stickers::catalog().len());
        assert!(listing.lines().all(|l| l.contains('\t')));
    }

    #[test]
    fn test_finish_reports_failures() {
        let report = ExportReport {
            delivered: vec!["carousel_slide_01.png".to_string()],
            failed: vec![(1, "boom".to_string())],
        };
        let err = finish(&report, Path::new("out")).expect_err("incomplete");
        assert!(err.to_string().contains("1 of 2"));
    }
}
