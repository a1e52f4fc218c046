//! Labeled training corpus discovery.

mod labels;
mod scan;

pub use labels::{LabelError, label_from_filename};
pub use scan::{DatasetScan, LabeledFile, ScanError, SkippedFile, scan_dataset};
