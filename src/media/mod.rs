//! Audio decode/encode/time-stretch/mix operations (C1, "Media Adapter").
//!
//! The pipeline never links a codec library; every operation here shells
//! out to FFmpeg via `ffmpeg-sidecar`, the pattern this workspace's media
//! crates use to avoid a `pkg-config` / dev-headers dependency.

mod ffmpeg;
mod types;

pub use ffmpeg::{build_atempo_filter_chain, rms_dbfs_of, FfmpegMedia};
pub use types::{AudioFormat, Pcm, ATEMPO_MAX, ATEMPO_MIN, DEFAULT_SAMPLE_RATE, SPEED_FACTOR_FLOOR};
