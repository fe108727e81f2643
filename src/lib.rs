//! # Scene Pairs
//!
//! Finds pairs of satellite scenes captured moments apart on the same pass
//! and renders their overlap for visual change detection.
//!
//! ## Outputs
//! - A looping two-frame flicker GIF of the overlap
//! - A three-band color-multiview GeoTIFF (first scene in red, second in
//!   green and blue)
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - Catalog access, pair finding, overlap and compositing
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SceneError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Filtering follows
/// `RUST_LOG`. Calling it twice keeps the first subscriber.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
