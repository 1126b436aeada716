//! # imgfit
//!
//! Batch image resizer that fits every output into a target file-size window.
//! Each source image is scaled so its smaller side is exactly the configured
//! minimum dimension, converted to the color model its output format can hold,
//! and re-encoded at varying quality until the encoded size lands inside the
//! window.
//!
//! ```text
//! source bytes ──decode──▶ color model ──resize once──▶ encode ◀──┐
//!                                                        │        │
//!                                                 size in window? ─┘ (bounded search)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The transcode core: dimension math, format table, quality search, codec backend |
//! | [`scan`] | Recursive discovery of supported source images |
//! | [`process`] | Parallel batch driver: reads, transcodes, mirrors the tree, reports |
//! | [`config`] | `imgfit.toml` loading and validation |
//! | [`output`] | CLI output formatting: status lines, header, summary |
//!
//! # Design Decisions
//!
//! ## Pure Core, Effectful Driver
//!
//! [`imaging::transcode`] takes bytes and returns bytes plus an
//! [`imaging::Outcome`]. It never reads or writes files and never logs, so
//! it can be tested with a mock backend and run from any number of threads
//! at once. The [`process`] module owns the filesystem, logging, and
//! progress reporting.
//!
//! ## Resize Once, Encode Many
//!
//! The image is resampled (Lanczos3) exactly once, before the quality search
//! starts. Every search attempt re-encodes the same pixels, so the only thing
//! varying between attempts is the encoder's quality parameter.
//!
//! ## Bounded Search
//!
//! The quality search is a binary search over `[floor, ceiling]` with a hard
//! attempt cap. Images that cannot reach the window are still written and
//! reported as near misses rather than errors.
//!
//! ## Extension Picks the Format
//!
//! The output file extension alone decides the encoder. Unknown extensions
//! encode as JPEG. Formats that cannot hold transparency get it flattened
//! onto white before resizing.

pub mod config;
pub mod imaging;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
