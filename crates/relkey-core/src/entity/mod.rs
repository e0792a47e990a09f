//! Keyed in-memory entities.

mod field;
mod keyed;

pub use field::FieldState;
pub use keyed::KeyedEntity;
