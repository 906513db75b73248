//! Category configuration registry and the base category-agent contract.

pub(crate) mod base_agent;
mod registry;
mod standard;

pub use base_agent::{process, CategoryAgentSpec, ProcessOutcome};
pub use registry::CategoryRegistry;
pub use standard::{
    register_default_templates, standard_categories, ActivityDerivedSpec, ActivitySpec,
};
