//! # CLI Module
//!
//! Command-line interface for scene pairing.
//!
//! ## Usage
//! ```bash
//! # List pairs in a saved search
//! scene-pairs pairs search.json
//!
//! # Render one pair
//! scene-pairs process a.tif b.tif --out-dir out/
//!
//! # Search, match and render everything
//! scene-pairs run search.json --rasters scenes/ --out-dir out/
//!
//! # JSON output
//! scene-pairs pairs search.json --output json
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use scene_pairs::core::catalog::{
    parse_acquired, parse_polygon_geojson, ImageCatalog, LocalCatalog, SearchQuery,
};
use scene_pairs::core::composite::Resampling;
use scene_pairs::core::matcher::{find_pairs, ImagePair, StripCriteria};
use scene_pairs::core::pipeline::{Pipeline, PipelineResult};
use scene_pairs::core::processor::{process_pair, PairOutputs, ProcessOptions};
use scene_pairs::error::{Result, SceneError};
use scene_pairs::events::{Event, EventChannel, PipelineEvent, ProcessEvent};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// Scene Pairs - find and compare near-simultaneous satellite scenes
#[derive(Parser, Debug)]
#[command(name = "scene-pairs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List scene pairs in a saved search result
    Pairs {
        /// GeoJSON search result file
        search: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Render the overlap of two GeoTIFFs
    Process {
        /// First scene
        first: PathBuf,

        /// Second scene
        second: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Search, find pairs and render every pair
    Run {
        /// GeoJSON search result file
        search: PathBuf,

        /// Directory holding one GeoTIFF per scene id
        #[arg(short, long)]
        rasters: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        render: RenderArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Maximum acquisition difference within a pair, in milliseconds
    #[arg(long, default_value = "2000")]
    max_delta_ms: i64,

    /// GeoJSON polygon the footprints must intersect
    #[arg(long)]
    aoi: Option<PathBuf>,

    /// Item types to keep (repeatable)
    #[arg(long = "item-type")]
    item_types: Vec<String>,

    /// Keep scenes acquired at or after this RFC 3339 time
    #[arg(long)]
    after: Option<String>,

    /// Keep scenes acquired at or before this RFC 3339 time
    #[arg(long)]
    before: Option<String>,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Output directory (default: next to the first scene)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Skip the flicker GIF
    #[arg(long)]
    no_flicker: bool,

    /// Skip the color-multiview GeoTIFF
    #[arg(long)]
    no_composite: bool,

    /// Delay between flicker frames in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u32,

    /// Resampling filter for crops of different resolution
    #[arg(long, default_value = "nearest")]
    resampling: ResamplingArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResamplingArg {
    /// Nearest neighbour (default)
    Nearest,
    /// Bilinear interpolation
    Bilinear,
}

impl From<ResamplingArg> for Resampling {
    fn from(arg: ResamplingArg) -> Self {
        match arg {
            ResamplingArg::Nearest => Resampling::Nearest,
            ResamplingArg::Bilinear => Resampling::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (one line per pair)
    Minimal,
}

impl FilterArgs {
    fn query(&self) -> Result<SearchQuery> {
        let aoi = match &self.aoi {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|e| {
                    SceneError::Config(format!("cannot read AOI {}: {}", path.display(), e))
                })?;
                let polygon = parse_polygon_geojson(&json).ok_or_else(|| {
                    SceneError::Config(format!("{} is not a GeoJSON polygon", path.display()))
                })?;
                Some(polygon)
            }
            None => None,
        };

        Ok(SearchQuery {
            aoi,
            item_types: self.item_types.clone(),
            acquired_after: parse_time_arg("--after", self.after.as_deref())?,
            acquired_before: parse_time_arg("--before", self.before.as_deref())?,
        })
    }

    fn max_delta(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.max_delta_ms)
    }

    fn criteria(&self) -> StripCriteria {
        StripCriteria::new().with_max_delta(self.max_delta())
    }
}

impl RenderArgs {
    fn options(&self) -> ProcessOptions {
        let mut options = ProcessOptions::default()
            .with_flicker(!self.no_flicker)
            .with_composite(!self.no_composite)
            .with_frame_delay_ms(self.delay_ms)
            .with_resampling(self.resampling.into());
        if let Some(dir) = &self.out_dir {
            options = options.with_out_dir(dir);
        }
        options
    }
}

fn parse_time_arg(flag: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(text) => parse_acquired(text).map(Some).ok_or_else(|| {
            SceneError::Config(format!("{} expects an RFC 3339 time, got {}", flag, text))
        }),
        None => Ok(None),
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pairs {
            search,
            filter,
            output,
        } => run_pairs(&search, &filter, output),
        Commands::Process {
            first,
            second,
            render,
            output,
        } => run_process(&first, &second, &render, output),
        Commands::Run {
            search,
            rasters,
            filter,
            render,
            output,
        } => run_pipeline(&search, &rasters, &filter, &render, output),
    }
}

fn print_header(term: &Term, output: OutputFormat) {
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Scene Pairs").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }
}

fn run_pairs(search: &Path, filter: &FilterArgs, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    print_header(&term, output);

    let catalog = LocalCatalog::from_search_file(search)?;
    let records = catalog.search(&filter.query()?)?;
    let pairs = find_pairs(&records, &filter.criteria());

    match output {
        OutputFormat::Pretty => {
            term.write_line(&format!(
                "  {} records, {} pairs",
                style(records.len()).cyan(),
                style(pairs.len()).cyan()
            ))
            .ok();
            term.write_line("").ok();
            for pair in &pairs {
                term.write_line(&format!(
                    "  {} {} {}",
                    pair.first.id,
                    style("<->").dim(),
                    pair.second.id
                ))
                .ok();
                term.write_line(&format!(
                    "    {}",
                    style(format!(
                        "satellite {}, strip {}, {:.3}s apart",
                        pair.first.satellite_id, pair.first.strip_id, pair.time_delta_secs
                    ))
                    .dim()
                ))
                .ok();
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "total_records": records.len(),
            "pairs": pairs.iter().map(pair_json).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Minimal => {
            for pair in &pairs {
                println!("{}\t{}", pair.first.id, pair.second.id);
            }
        }
    }

    Ok(())
}

fn run_process(
    first: &Path,
    second: &Path,
    render: &RenderArgs,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    print_header(&term, output);

    let outputs = process_pair(first, second, &render.options())?;

    match output {
        OutputFormat::Pretty => {
            term.write_line(&format!(
                "{} {} ({}x{})",
                style("✓").green().bold(),
                outputs.basename,
                outputs.width,
                outputs.height
            ))
            .ok();
            print_output_paths(&term, &outputs);
        }
        OutputFormat::Json => print_json(&serde_json::to_value(&outputs).map_err(json_error)?)?,
        OutputFormat::Minimal => print_minimal_outputs(&outputs),
    }

    Ok(())
}

fn run_pipeline(
    search: &Path,
    rasters: &Path,
    filter: &FilterArgs,
    render: &RenderArgs,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    print_header(&term, output);

    let catalog = LocalCatalog::open(search, rasters)?;

    let mut options = render.options();
    if options.out_dir.is_none() {
        options = options.with_out_dir(rasters);
    }

    let pipeline = Pipeline::builder()
        .query(filter.query()?)
        .max_time_delta(filter.max_delta())
        .process_options(options)
        .build();

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = &progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Process(ProcessEvent::Started { total_pairs }) => {
                    pb.set_length(total_pairs as u64);
                }
                Event::Process(ProcessEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Process(ProcessEvent::Error { basename, message }) => {
                    pb.println(format!("  {} {}: {}", style("!").yellow(), basename, message));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&catalog, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_run(&term, &result),
        OutputFormat::Json => print_json(&serde_json::json!({
            "total_records": result.total_records,
            "total_pairs": result.pairs.len(),
            "duration_ms": result.duration_ms,
            "pairs": result.pairs.iter().map(pair_json).collect::<Vec<_>>(),
            "outputs": result.outputs,
            "errors": result.errors,
        }))?,
        OutputFormat::Minimal => {
            for outputs in &result.outputs {
                print_minimal_outputs(outputs);
            }
        }
    }

    Ok(())
}

fn print_pretty_run(term: &Term, result: &PipelineResult) {
    term.write_line("").ok();
    term.write_line(&format!("{} Run Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} records searched in {:.1}s",
        style(result.total_records).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} pairs found", style(result.pairs.len()).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} pairs rendered",
        style(result.outputs.len()).cyan()
    ))
    .ok();

    if !result.errors.is_empty() {
        term.write_line(&format!(
            "  {} pairs skipped",
            style(result.errors.len()).yellow()
        ))
        .ok();
    }

    term.write_line("").ok();

    for outputs in &result.outputs {
        term.write_line(&format!("  {}", style(&outputs.basename).bold()))
            .ok();
        print_output_paths(term, outputs);
    }

    for error in &result.errors {
        term.write_line(&format!("  {} {}", style("✗").red(), error))
            .ok();
    }
}

fn print_output_paths(term: &Term, outputs: &PairOutputs) {
    for path in outputs.flicker.iter().chain(outputs.composite.iter()) {
        term.write_line(&format!("    {}", style(path.display()).dim()))
            .ok();
    }
}

fn print_minimal_outputs(outputs: &PairOutputs) {
    for path in outputs.flicker.iter().chain(outputs.composite.iter()) {
        println!("{}", path.display());
    }
}

fn pair_json(pair: &ImagePair) -> serde_json::Value {
    serde_json::json!({
        "first": pair.first.id,
        "second": pair.second.id,
        "satellite_id": pair.first.satellite_id,
        "strip_id": pair.first.strip_id,
        "time_delta_secs": pair.time_delta_secs,
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(json_error)?;
    println!("{}", text);
    Ok(())
}

fn json_error(e: serde_json::Error) -> SceneError {
    SceneError::Config(format!("cannot serialize output: {}", e))
}
