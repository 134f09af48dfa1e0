pub mod field;
pub mod ids;

pub use field::{Alias, TrackedField, Value};
pub use ids::{EntityId, InvalidId, ObjectId};
