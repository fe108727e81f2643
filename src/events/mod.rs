//! # Events Module
//!
//! Progress reporting for searches, matching and pair processing.
//!
//! The core library emits events through a channel so any front end can
//! subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Match(MatchEvent::PairFound { first, second }) = event {
//!             println!("{} <-> {}", first, second);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
