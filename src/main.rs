//! # scene-pairs CLI
//!
//! Command-line interface for finding and comparing scene pairs.
//!
//! ## Usage
//! ```bash
//! scene-pairs pairs search.json
//! scene-pairs run search.json --rasters scenes/ --out-dir out/ --output json
//! ```

mod cli;

use scene_pairs::Result;

fn main() -> Result<()> {
    scene_pairs::init_tracing();
    cli::run()
}
