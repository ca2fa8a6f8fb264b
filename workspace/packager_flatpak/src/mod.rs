pub mod build_pipeline;
pub mod runner;
pub mod steps;
