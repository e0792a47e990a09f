//! relkey value types and conversions.
//!
//! This crate defines the value layer shared by the relkey data-access core.
//!
//! # Modules
//!
//! - [`value`] - Typed domain values carried by entities and predicates
//! - [`decimal`] - Exact base-10 fixed-point numbers
//! - [`types`] - Column type tags, storage values and their conversions
//! - [`error`] - Value-layer error types
//!
//! # Conversions
//!
//! Each column declares a [`TypeTag`]. The tag converts domain values to the
//! storage form handed to an executor, and storage values back:
//!
//! ```
//! use relkey_proto::{RawValue, TypeTag, Value};
//!
//! let raw = TypeTag::Decimal.to_raw(&Value::from("12.50")).unwrap();
//! assert_eq!(raw, RawValue::Text("12.5".into()));
//! let value = TypeTag::Decimal.from_raw(&raw).unwrap();
//! assert_eq!(value.to_string(), "12.5");
//! ```

pub mod decimal;
pub mod error;
pub mod types;
pub mod value;

pub use decimal::ExactDecimal;
pub use error::Error;
pub use types::{
    parse_date, parse_datetime, RawValue, TypeTag, DATETIME_FORMAT, DATE_FORMAT,
    TIMESTAMP_FORMAT,
};
pub use value::Value;
