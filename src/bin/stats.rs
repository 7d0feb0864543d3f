use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::Parser;
use tracing::info;

use matchviz::charts::ChartRenderer;
use matchviz::fonts::CosmicTextMeasure;
use matchviz::output::{MATCH_RATE_CHART, MONTHLY_TREND_CHART, OutputTargets};
use matchviz::stats::{SnapshotFile, StatsSource, Summary, YearMonth, summarize};
use matchviz::theme::Theme;
use matchviz::Result;

/// Matching statistics chart renderer
#[derive(Parser, Debug)]
#[command(name = "matchviz-stats")]
#[command(version)]
#[command(about = "Render match rate and monthly trend charts plus a JSON summary", long_about = None)]
struct Args {
    /// Statistics snapshot (JSON or YAML)
    #[arg(long, value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Built-in theme name or path to a theme file (TOML or YAML)
    #[arg(short, long, value_name = "THEME", default_value = "classic")]
    theme: String,

    /// Project root; images go below app/assets/images and public, the summary below public
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Raster scale multiplier for PNG output
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// Month the trend ends at (YYYY-MM); the current month when omitted
    #[arg(long, value_name = "YYYY-MM")]
    month: Option<String>,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    matchviz::init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let theme = Theme::resolve(&args.theme)?;
    let current = match args.month.as_deref() {
        Some(month) => month.parse::<YearMonth>()?,
        None => YearMonth::current(),
    };

    let snapshot = SnapshotFile::new(&args.snapshot).fetch()?;
    let stats = summarize(snapshot.counts, &snapshot.monthly, current);
    info!(
        total_users = stats.counts.total_users,
        match_rate = stats.match_rate,
        success_rate = stats.success_rate,
        "computed statistics"
    );

    let mut measure = CosmicTextMeasure::new();
    let mut charts = ChartRenderer::new(&theme, &mut measure);
    let proportion = charts.render_proportion(&stats).to_png(args.png_scale)?;
    let trend = charts.render_trend(&stats).to_png(args.png_scale)?;

    let targets = OutputTargets::under_root(&args.root);
    targets.write_image(MATCH_RATE_CHART, &proportion)?;
    targets.write_image(MONTHLY_TREND_CHART, &trend)?;
    targets.write_summary(&Summary::new(&stats, Local::now().naive_local()))?;

    info!("charts generated");
    Ok(())
}
