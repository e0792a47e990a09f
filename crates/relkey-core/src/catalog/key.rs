//! Composite ordered keys.

use serde::{Deserialize, Serialize};

/// One column of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    /// Column identifier.
    pub column: String,
    /// Sort direction of this part.
    #[serde(default = "ascending_default")]
    pub ascending: bool,
}

fn ascending_default() -> bool {
    true
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// SQL keyword for this direction.
    pub fn keyword(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }

    /// The opposite direction.
    pub fn reversed(&self) -> Self {
        match self {
            OrderDirection::Asc => OrderDirection::Desc,
            OrderDirection::Desc => OrderDirection::Asc,
        }
    }
}

impl KeyPart {
    /// Create ascending key part.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    /// Create descending key part.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Sort direction of this part.
    pub fn direction(&self) -> OrderDirection {
        if self.ascending {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        }
    }
}

/// Ordered list of key parts defining row order and range semantics.
///
/// The part order defines lexicographic tuple comparison and should match a
/// supporting storage index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey {
    parts: Vec<KeyPart>,
}

impl CompositeKey {
    /// Create a key from its parts.
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    /// Create an all-ascending key over the given columns.
    pub fn ascending<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: columns.into_iter().map(KeyPart::asc).collect(),
        }
    }

    /// Append an ascending part.
    pub fn then_asc(mut self, column: impl Into<String>) -> Self {
        self.parts.push(KeyPart::asc(column));
        self
    }

    /// Append a descending part.
    pub fn then_desc(mut self, column: impl Into<String>) -> Self {
        self.parts.push(KeyPart::desc(column));
        self
    }

    /// Key parts in order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Number of key columns.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the key has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Key column identifiers in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.column.as_str())
    }

    /// Check if `column` is part of the key.
    pub fn contains(&self, column: &str) -> bool {
        self.parts.iter().any(|p| p.column == column)
    }
}
