//! Entity-relationship diagram and matching statistics renderer.
//!
//! The diagram engine ([`schema`], [`diagram`]) and the chart renderers
//! ([`stats`], [`charts`]) draw onto a [`canvas::Canvas`], which is rasterized
//! to PNG and written by [`output`].

pub mod canvas;
pub mod charts;
pub mod diagram;
pub mod error;
pub mod fonts;
pub mod output;
pub mod schema;
pub mod stats;
pub mod theme;

pub use error::{Error, Result};

use tracing::Level;

/// Install the stderr log subscriber used by the binaries.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
