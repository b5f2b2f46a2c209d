//! Pipeline stages: operator chain, engine execution, reprojection and quick-looks

pub mod operators;
pub mod graph;
pub mod engine;
pub mod preprocess;
pub mod reproject;
pub mod stretch;
pub mod visualize;

// Re-export main types
pub use operators::{
    OperatorStep, ParamValue, ApplyOrbitParams, ThermalNoiseParams, CalibrationParams,
    SpeckleFilterParams, TerrainCorrectionParams,
};
pub use graph::{ProcessingGraph, OutputFormat, WriteTarget};
pub use engine::{ProcessingEngine, GptEngine, DryRunEngine, EngineConfig};
pub use preprocess::{build_chain, build_graph, preprocess_slc, run_pipeline, PreprocessOutputs, PipelineOutputs};
pub use reproject::{reproject_geotiff, reprojected_path, ReprojectedRaster};
pub use stretch::{percentile, stretch_percentile, band_ratio, rgb_composite, Composite, StretchParams, StretchBounds};
pub use visualize::{view_geotiff, QuickLooks};
