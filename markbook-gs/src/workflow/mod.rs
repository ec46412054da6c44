//! Grading workflow orchestration

pub mod grading_pipeline;

pub use grading_pipeline::GradingPipeline;
