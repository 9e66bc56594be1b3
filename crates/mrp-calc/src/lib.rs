pub mod allocation;
pub mod critical_path;
pub mod engine;
pub mod explosion;
pub mod planning;
pub mod shortage;

pub use allocation::*;
pub use critical_path::*;
pub use engine::*;
pub use explosion::*;
pub use planning::*;
pub use shortage::*;
