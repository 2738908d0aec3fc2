//! Utility functions and types

pub mod data_loader;

pub use data_loader::{array_to_frame, frame_to_array, load_fire_csv, map_fire_labels, LabeledDataset};
