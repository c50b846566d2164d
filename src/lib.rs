//! # Linegrab
//!
//! A line-oriented timing instrument: annotate a byte stream (stdin, a
//! character device, or a launched subprocess) with per-line elapsed/delta
//! timing, tee it to a rotating file, and stop or restart on pattern matches
//! or a wall-clock deadline.
//!
//! ## Usage
//!
//! ```bash
//! linegrab -t [-o capture.log] [-m basepat] [-q quitpat] [-e seconds]
//! ```
//!
//! ## Modules
//!
//! - `config` - Immutable session configuration and output filename templating
//! - `encoding` - Encoder fallback chain and permissive incremental decoding
//! - `engine` - The byte-stream engine: blocking byte loop and stop reasons
//! - `forward` - Background forwarding of interactive input to the write side
//! - `patterns` - The base/inline/quit regular-expression slots
//! - `session` - Session driver: open resources, run the engine, honor restart
//! - `sink` - Dual-target output: live echo plus optional rotating file
//! - `source` - Byte sources: stdin, character device, subprocess
//! - `timing` - Basetime/elapsed/delta bookkeeping and annotation formatting
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod forward;
pub mod patterns;
pub mod session;
pub mod sink;
pub mod source;
pub mod timing;

pub use error::{Error, Result};
