use thiserror::Error;

#[derive(Error, Debug)]
pub enum MrpError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Part not found in BOM: {0}")]
    PartNotFound(String),

    #[error("Inventory record not found: {0}")]
    InventoryNotFound(String),

    #[error("Circular dependency detected in BOM: {0}")]
    CircularDependency(String),

    #[error("Overlapping effectivity for {parent} -> {child}: [{first}] overlaps [{second}]")]
    EffectivityOverlap {
        parent: String,
        child: String,
        first: String,
        second: String,
    },

    #[error("Planning run cancelled")]
    Cancelled,

    #[error("Allocation error: {0}")]
    AllocationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

pub type Result<T> = std::result::Result<T, MrpError>;
