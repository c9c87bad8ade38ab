//! Business-flow definitions and their resolution to engine processes.

pub mod catalog;


pub use catalog::{FlowCatalog, FlowDefinition, FlowError};
