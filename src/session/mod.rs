//! Session lifecycle and append-only metadata store (C2).

pub mod csv_export;
pub mod layout;
pub mod metadata;
mod store;
mod types;

pub use csv_export::build_diarization_csv;
pub use layout::Layout;
pub use store::SessionStore;
pub use types::{
    AlignmentGlobalStats, AlignmentMetadata, AlignmentStatus, Diarization, MergedDiarization,
    MergedSegment, QualityLevel, Segment, SegmentAlignment, SeparationMetadata, SeparationStats,
    SessionMetadata,
};
