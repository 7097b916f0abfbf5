pub mod calibrator;
pub mod centroid;
pub mod color_segmenter;
pub mod displacement_tracker;
pub mod frame;
