#![cfg_attr(coverage, feature(coverage_attribute))]
mod attributes;
pub mod config;
pub mod container;
pub mod engine;
pub mod errors;
pub mod hash;
mod injector;
pub mod policy;
pub mod reconcile;

pub use config::*;
pub use engine::{
    EngineConfig,
    SidecarTemplate,
};
pub use errors::InjectorError;
pub use injector::{
    Injector,
    RequestOptions,
};

#[cfg(test)]
mod tests;
