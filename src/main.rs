use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::Parser;
use tracing::info;

use matchviz::diagram::DiagramRenderer;
use matchviz::fonts::CosmicTextMeasure;
use matchviz::output::{ER_DIAGRAM, OutputTargets};
use matchviz::schema::Schema;
use matchviz::theme::Theme;
use matchviz::{Error, Result};

/// Entity-relationship diagram renderer
#[derive(Parser, Debug)]
#[command(name = "matchviz")]
#[command(version)]
#[command(about = "Render the application's entity-relationship diagram to PNG", long_about = None)]
struct Args {
    /// Schema document (.yaml, .toml or .json); the built-in schema when omitted
    #[arg(short, long, value_name = "SCHEMA")]
    schema: Option<PathBuf>,

    /// Built-in theme name or path to a theme file (TOML or YAML)
    #[arg(short, long, value_name = "THEME", default_value = "classic")]
    theme: String,

    /// Project root; images are written below app/assets/images and public
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// Log debug events, including every routed relationship
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

fn load_schema(path: Option<&PathBuf>) -> Result<Schema> {
    let Some(path) = path else {
        return Ok(Schema::builtin()?);
    };
    let content = std::fs::read_to_string(path).map_err(|source| Error::Input {
        path: path.clone(),
        source,
    })?;
    Ok(Schema::from_path_and_str(path, &content)?)
}

fn run(args: Args) -> Result<()> {
    let theme = Theme::resolve(&args.theme)?;
    let schema = load_schema(args.schema.as_ref())?;
    info!(
        entities = schema.entities.len(),
        relationships = schema.relationships.len(),
        "loaded schema"
    );

    let mut measure = CosmicTextMeasure::new();
    let canvas = DiagramRenderer::new(&theme, &mut measure)
        .render(&schema, Local::now().naive_local())?;
    let png = canvas.to_png(args.png_scale)?;

    OutputTargets::under_root(&args.root).write_image(ER_DIAGRAM, &png)?;
    info!("ER diagram generated");
    Ok(())
}
