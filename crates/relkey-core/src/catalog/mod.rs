//! Static schema descriptors.
//!
//! A [`TableDef`] lists the table's [`ColumnSpec`]s and its [`CompositeKey`].
//! Descriptors are built once per table type and shared by reference.

mod column;
mod key;
mod table;

pub use column::{ColumnSpec, StampRole};
pub use key::{CompositeKey, KeyPart, OrderDirection};
pub use table::TableDef;
