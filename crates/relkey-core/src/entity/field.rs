//! Per-column field state.

use relkey_proto::Value;

/// State of one column in an entity.
///
/// `Unset` means "never assigned" and is distinct from an explicit `Null`:
/// unset columns are left out of inserts and updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FieldState {
    /// Not assigned.
    #[default]
    Unset,
    /// Explicit null.
    Null,
    /// A non-null value.
    Value(Value),
}

impl FieldState {
    /// Check if the field was assigned (null counts as assigned).
    pub fn is_set(&self) -> bool {
        !matches!(self, FieldState::Unset)
    }

    /// Check if the field is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldState::Null)
    }

    /// The non-null value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldState::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The assigned value with null as `Value::Null`; `None` when unset.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            FieldState::Unset => None,
            FieldState::Null => Some(Value::Null),
            FieldState::Value(v) => Some(v.clone()),
        }
    }
}

impl From<Value> for FieldState {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldState::Null,
            other => FieldState::Value(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_states() {
        assert!(!FieldState::Unset.is_set());
        assert!(FieldState::Null.is_set());
        assert!(FieldState::Null.is_null());
        assert!(FieldState::Value(Value::Integer(1)).is_set());

        assert_eq!(FieldState::Unset.to_value(), None);
        assert_eq!(FieldState::Null.to_value(), Some(Value::Null));
        assert_eq!(FieldState::default(), FieldState::Unset);
    }

    #[test]
    fn test_null_value_becomes_null_state() {
        assert_eq!(FieldState::from(Value::Null), FieldState::Null);
        assert_eq!(
            FieldState::from(Value::from("x")).value(),
            Some(&Value::String("x".into()))
        );
    }
}
