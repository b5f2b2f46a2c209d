//! I/O modules for reading SAFE archives and areas of interest

pub mod slc_reader;
pub mod aoi;

pub use slc_reader::{SlcReader, MeasurementFile};
pub use aoi::Aoi;
