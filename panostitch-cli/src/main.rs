use clap::Parser;
use panostitch::image::io::{load_gray_image, save_gray_image};
use panostitch::viz::draw_matches;
use panostitch::{
    best_n, CanvasSizing, FeatureExtractor, FeatureMatcher, HarrisConfig, HarrisPatchExtractor,
    MatchStrategy, MatcherConfig, MosaicBuilder, MosaicConfig, OwnedImage, RansacConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "panostitch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Matches,
    #[default]
    Mosaic,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrategyConfig {
    #[default]
    CrossCheck,
    RatioTest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SizingConfig {
    #[default]
    Sum,
    Tight,
}

impl From<SizingConfig> for CanvasSizing {
    fn from(value: SizingConfig) -> Self {
        match value {
            SizingConfig::Sum => CanvasSizing::Sum,
            SizingConfig::Tight => CanvasSizing::Tight,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExtractorConfigJson {
    max_features: usize,
    k: f32,
    window_radius: usize,
    min_response_ratio: f32,
    nms_radius: usize,
    patch_radius: usize,
}

impl Default for ExtractorConfigJson {
    fn default() -> Self {
        let cfg = HarrisConfig::default();
        Self {
            max_features: cfg.max_features,
            k: cfg.k,
            window_radius: cfg.window_radius,
            min_response_ratio: cfg.min_response_ratio,
            nms_radius: cfg.nms_radius,
            patch_radius: cfg.patch_radius,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RansacConfigJson {
    max_iters: usize,
    reproj_threshold: f64,
    confidence: f64,
    min_sample_area: f64,
    seed: u64,
    time_budget_ms: Option<u64>,
}

impl Default for RansacConfigJson {
    fn default() -> Self {
        let cfg = RansacConfig::default();
        Self {
            max_iters: cfg.max_iters,
            reproj_threshold: cfg.reproj_threshold,
            confidence: cfg.confidence,
            min_sample_area: cfg.min_sample_area,
            seed: cfg.seed,
            time_budget_ms: None,
        }
    }
}

impl From<RansacConfigJson> for RansacConfig {
    fn from(value: RansacConfigJson) -> Self {
        Self {
            max_iters: value.max_iters,
            reproj_threshold: value.reproj_threshold,
            confidence: value.confidence,
            min_sample_area: value.min_sample_area,
            seed: value.seed,
            time_budget: value.time_budget_ms.map(Duration::from_millis),
            cancel: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MosaicConfigJson {
    sizing: SizingConfig,
    parallel: bool,
    crop: bool,
    max_canvas_pixels: usize,
}

impl Default for MosaicConfigJson {
    fn default() -> Self {
        let cfg = MosaicConfig::default();
        Self {
            sizing: SizingConfig::Sum,
            parallel: cfg.parallel,
            crop: true,
            max_canvas_pixels: cfg.max_canvas_pixels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    mode: Mode,
    image_paths: Vec<String>,
    output_path: Option<String>,
    anchor: Option<usize>,
    strategy: StrategyConfig,
    ratio: f32,
    best_n: usize,
    extractor: ExtractorConfigJson,
    ransac: RansacConfigJson,
    mosaic: MosaicConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Mosaic,
            image_paths: Vec::new(),
            output_path: None,
            anchor: None,
            strategy: StrategyConfig::CrossCheck,
            ratio: panostitch::matching::DEFAULT_RATIO,
            best_n: 50,
            extractor: ExtractorConfigJson::default(),
            ransac: RansacConfigJson::default(),
            mosaic: MosaicConfigJson::default(),
        }
    }
}

impl Config {
    fn extractor_config(&self) -> HarrisConfig {
        let e = &self.extractor;
        HarrisConfig {
            max_features: e.max_features,
            k: e.k,
            window_radius: e.window_radius,
            min_response_ratio: e.min_response_ratio,
            nms_radius: e.nms_radius,
            patch_radius: e.patch_radius,
        }
    }

    fn matcher_config(&self) -> MatcherConfig {
        let strategy = match self.strategy {
            StrategyConfig::CrossCheck => MatchStrategy::CrossCheck,
            StrategyConfig::RatioTest => MatchStrategy::RatioTest { ratio: self.ratio },
        };
        MatcherConfig {
            strategy,
            parallel: self.mosaic.parallel,
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    query: usize,
    train: usize,
    distance: f32,
    query_xy: [f32; 2],
    train_xy: [f32; 2],
}

#[derive(Debug, Serialize)]
struct MatchesOutput {
    query_features: usize,
    train_features: usize,
    total: usize,
    shown: Vec<MatchRecord>,
}

#[derive(Debug, Serialize)]
struct PairRecord {
    from: usize,
    to: usize,
    matches: usize,
    inliers: usize,
}

#[derive(Debug, Serialize)]
struct MosaicOutput {
    images: usize,
    anchor: usize,
    width: usize,
    height: usize,
    pairs: Vec<PairRecord>,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("panostitch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_paths.is_empty() {
        return Err("image_paths must list at least one image".into());
    }

    let images = config
        .image_paths
        .iter()
        .map(load_gray_image)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(images = images.len(), "loaded images");

    match config.mode {
        Mode::Matches => run_matches(&config, &images),
        Mode::Mosaic => run_mosaic(config, &images),
    }
}

fn run_matches(config: &Config, images: &[OwnedImage]) -> Result<(), Box<dyn std::error::Error>> {
    let [a, b] = images else {
        return Err("matches mode needs exactly two image_paths".into());
    };

    let extractor = HarrisPatchExtractor::new(config.extractor_config());
    let fa = extractor.extract(a.view());
    let fb = extractor.extract(b.view());
    let matcher = FeatureMatcher::new().with_config(config.matcher_config());
    let matches = matcher.match_features(&fa, &fb)?;
    let shown = best_n(&matches, config.best_n);

    if let Some(path) = &config.output_path {
        let canvas = draw_matches(a.view(), &fa, b.view(), &fb, &matches, config.best_n)?;
        canvas.save(path)?;
    }

    let records = shown
        .iter()
        .filter_map(|m| {
            let qa = fa.keypoint(m.query_idx)?;
            let tb = fb.keypoint(m.train_idx)?;
            Some(MatchRecord {
                query: m.query_idx,
                train: m.train_idx,
                distance: m.distance,
                query_xy: [qa.x, qa.y],
                train_xy: [tb.x, tb.y],
            })
        })
        .collect();
    let output = MatchesOutput {
        query_features: fa.len(),
        train_features: fb.len(),
        total: matches.len(),
        shown: records,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_mosaic(config: Config, images: &[OwnedImage]) -> Result<(), Box<dyn std::error::Error>> {
    let Some(output_path) = config.output_path.clone() else {
        return Err("mosaic mode needs output_path".into());
    };
    let anchor = config.anchor.unwrap_or(images.len() / 2);
    let matcher = config.matcher_config();
    let extractor = HarrisPatchExtractor::new(config.extractor_config());
    let crop_result = config.mosaic.crop;
    let builder = MosaicBuilder::new(extractor).with_config(MosaicConfig {
        matcher,
        ransac: config.ransac.into(),
        sizing: config.mosaic.sizing.into(),
        parallel: config.mosaic.parallel,
        max_canvas_pixels: config.mosaic.max_canvas_pixels,
    });

    let composition = builder.compose_detailed(images, anchor)?;
    let pairs = composition
        .pairs
        .iter()
        .map(|p| PairRecord {
            from: p.from,
            to: p.to,
            matches: p.matches,
            inliers: p.inliers,
        })
        .collect();
    let result = if crop_result {
        panostitch::crop(composition.canvas.view())?
    } else {
        composition.canvas
    };
    save_gray_image(&result, &output_path)?;

    let output = MosaicOutput {
        images: images.len(),
        anchor,
        width: result.width(),
        height: result.height(),
        pairs,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

