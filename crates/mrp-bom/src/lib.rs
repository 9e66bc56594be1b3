//! Serial-effective BOM traversal: the visitor contract, the generic
//! post-order walker, and alternate-group resolution.

pub mod alternates;
pub mod traverser;
pub mod visitor;

pub use alternates::*;
pub use traverser::*;
pub use visitor::*;
