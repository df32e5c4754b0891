//! Tabular I/O on top of polars.

pub mod dataframe;

pub use dataframe::{counts_frame, cube_to_frame, events_frame, frame_to_cube, write_csv};
