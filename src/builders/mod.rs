//! Builders to construct admission components from configuration.

pub mod component_builder;

pub use component_builder::{build_limiters, build_schedulers};
