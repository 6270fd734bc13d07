//! Stage templates and the resolver that selects one per order.

mod catalog;
mod definition;
mod registry;
mod resolver;

pub use catalog::{default_templates, load_catalog, parse_catalog};
pub use definition::{
    ProcessPathType, SelectionCriteria, StageConfig, StageDefinition, StageKind, StageTemplate,
};
pub use registry::TemplateRegistry;
pub use resolver::{ExecutionPlan, PlanRequest, ResolveRequest, RouteResolver};

use thiserror::Error;

/// Errors that can occur while registering or selecting templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No registered template accepts the order.
    #[error("No matching template for path type {path_type} with {item_count} items")]
    NoMatchingTemplate {
        path_type: ProcessPathType,
        item_count: u32,
    },

    /// Template ID is required.
    #[error("Template ID is required")]
    MissingTemplateId,

    /// Template has no stages.
    #[error("Template {template_id} has no stages")]
    NoStages { template_id: String },

    /// Stage ordinals do not run 1..=N.
    #[error("Template {template_id}: expected stage {expected}, found stage {found}")]
    NonContiguousStages {
        template_id: String,
        expected: u32,
        found: u32,
    },

    /// Minimum item count exceeds the maximum.
    #[error("Template {template_id}: min items {min} exceeds max items {max}")]
    InvertedItemBounds {
        template_id: String,
        min: u32,
        max: u32,
    },

    /// The same template ID was registered under a different path type.
    #[error("Template {template_id} is already registered under {existing}")]
    PathTypeMismatch {
        template_id: String,
        existing: ProcessPathType,
    },

    /// The catalog file could not be read.
    #[error("Failed to read template catalog: {0}")]
    CatalogIo(#[from] std::io::Error),

    /// The catalog file is not a valid template list.
    #[error("Invalid template catalog: {0}")]
    CatalogFormat(#[from] serde_json::Error),
}

impl TemplateError {
    /// Returns true if the error describes a malformed template rather than
    /// a failed lookup.
    pub fn is_invalid_template(&self) -> bool {
        !matches!(self, TemplateError::NoMatchingTemplate { .. })
    }
}
