//! Business records the rules act on.
//!
//! Each target model has a fixed schema; [`ModelRecord`] is the adapter that
//! exposes a record of any model through the engine's `Record` capability.

mod model;
mod record;
pub mod schema;
mod store;

pub use model::TargetModel;
pub use record::ModelRecord;
pub use schema::{FieldKind, FieldSpec};
pub use store::RecordStore;
