//! relkey core - composite-key data access over relational storage.
//!
//! Tables are described statically by a [`TableDef`]: typed columns plus a
//! [`CompositeKey`]. Key ranges expand into lexicographic predicates, rows
//! live in memory as [`KeyedEntity`]s, and a [`BatchQueryPlanner`] folds
//! scattered key lookups into one query per flush.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relkey_core::proto::TypeTag;
//! use relkey_core::{
//!     ColumnSpec, CompositeKey, ExecutorContext, KeyRange, SelectQuery, SqliteExecutor,
//!     TableDef, UnitOfWork,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let orders = Arc::new(
//!     TableDef::new("orders")
//!         .with_column(ColumnSpec::new("region", TypeTag::String))
//!         .with_column(ColumnSpec::new("id", TypeTag::Integer))
//!         .with_key(CompositeKey::ascending(["region", "id"])),
//! );
//!
//! let executor = SqliteExecutor::open_in_memory()?;
//! let mut uow = UnitOfWork::new(executor, ExecutorContext::new("alice", "reports"));
//! let rows = uow.select(&orders, &SelectQuery::range(KeyRange::ge(["E"])))?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod query;
pub mod unit;

pub use catalog::{ColumnSpec, CompositeKey, KeyPart, OrderDirection, StampRole, TableDef};
pub use config::{BuilderConfig, PlaceholderStyle};
pub use entity::{FieldState, KeyedEntity};
pub use error::{BoxError, Error, StorageError};
#[cfg(feature = "sqlite")]
pub use executor::SqliteExecutor;
pub use executor::{Executor, ExecutorContext, Row};
pub use query::{
    BatchQueryPlanner, CollectionHandle, CompareOp, EntityHandle, KeyRange, PlannerStats,
    Predicate, Resolution, SelectQuery, Statement, StatementBuilder, StatementKind,
};
pub use unit::UnitOfWork;

/// Re-export value types.
pub use relkey_proto as proto;
