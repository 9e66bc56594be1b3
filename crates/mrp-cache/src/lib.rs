//! Explosion memoization.
//!
//! Sub-trees reachable through the same `(part, target serial)` expand to
//! the same unit structure; caching them amortizes repeated traversal
//! across wide BOMs. The cache is strictly an accelerator: any plan
//! computed with it enabled is identical to the uncached plan.

pub mod explosion_cache;

pub use explosion_cache::*;
