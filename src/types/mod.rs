//! Engine type tags and typed row values.

mod mapping;
mod value;

pub use mapping::EngineType;
pub use value::{Row, Value, ValueResolver};
