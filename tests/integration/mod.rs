//! End-to-end tests over real directories: staging, fixity and assembly

mod assembly_scenarios;
mod fixity_pipeline;
mod staging_layout;
