//! Key-range predicates over composite keys.
//!
//! A [`KeyRange`] pairs an operator with one or more value tuples. Expanding
//! it against a [`CompositeKey`] yields a [`Predicate`] tree implementing
//! lexicographic tuple comparison over the key columns:
//!
//! - `Eq`: `K1 = v1 AND ... AND Km = vm`
//! - `Gt`/`Lt`: `OR` over i of `(K1 = v1 AND ... AND Ki > vi)`
//! - `Ge`/`Le`: as `Gt`/`Lt`, with the last clause inclusive
//! - `Between`: `Ge(start) AND Le(end)`, a plain `BETWEEN` for one column
//! - `In`: `K1 IN (...)` for non-null one-column tuples, else `OR` of `Eq`
//!   expansions
//! - `Like`: `Eq` over the leading values, `LIKE` on the last one
//!
//! Tuples shorter than the key are prefix matches; the remaining key columns
//! stay unconstrained. Comparisons follow key order, so on a descending key
//! part `>` is written as `<`.

use relkey_proto::Value;

use crate::catalog::{CompositeKey, KeyPart};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// SQL spelling of this operator.
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// The operator with its operands swapped.
    pub fn mirrored(&self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => *other,
        }
    }
}

/// Predicate tree over table columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column op value`.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column IS NULL`.
    IsNull { column: String },
    /// `column IS NOT NULL`.
    IsNotNull { column: String },
    /// `column IN (values...)`.
    In { column: String, values: Vec<Value> },
    /// `column BETWEEN low AND high`.
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    /// `column LIKE pattern`.
    Like { column: String, pattern: Value },
    /// Conjunction.
    And(Vec<Predicate>),
    /// Disjunction.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `column = value`, or `column IS NULL` for a null value.
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        let column = column.into();
        if value.is_null() {
            Predicate::IsNull { column }
        } else {
            Predicate::Compare {
                column,
                op: CompareOp::Eq,
                value,
            }
        }
    }

    /// `column op value`.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    /// Conjunction of `parts`; nested conjunctions are flattened and a single
    /// part is returned as is.
    pub fn and(parts: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::And(flat)
        }
    }

    /// Disjunction of `parts`; nested disjunctions are flattened and a single
    /// part is returned as is.
    pub fn or(parts: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::Or(flat)
        }
    }

    /// Check if this node combines other predicates.
    pub fn is_compound(&self) -> bool {
        matches!(self, Predicate::And(_) | Predicate::Or(_))
    }
}

/// An operator with the value tuple(s) it applies to a composite key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRange {
    /// Key prefix equals the tuple.
    Eq(Vec<Value>),
    /// Key prefix sorts after the tuple.
    Gt(Vec<Value>),
    /// Key prefix sorts before the tuple.
    Lt(Vec<Value>),
    /// Key prefix sorts at or after the tuple.
    Ge(Vec<Value>),
    /// Key prefix sorts at or before the tuple.
    Le(Vec<Value>),
    /// Key prefix lies between `start` and `end`, both inclusive.
    Between { start: Vec<Value>, end: Vec<Value> },
    /// Key prefix equals one of the tuples.
    In(Vec<Vec<Value>>),
    /// Leading values equal, last value is a LIKE pattern.
    Like(Vec<Value>),
}

fn tuple<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

impl KeyRange {
    /// Equality on a key prefix.
    pub fn eq<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Eq(tuple(values))
    }

    /// Strictly after a key prefix.
    pub fn gt<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Gt(tuple(values))
    }

    /// Strictly before a key prefix.
    pub fn lt<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Lt(tuple(values))
    }

    /// At or after a key prefix.
    pub fn ge<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Ge(tuple(values))
    }

    /// At or before a key prefix.
    pub fn le<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Le(tuple(values))
    }

    /// Between two key prefixes, inclusive.
    pub fn between<I, J, V, W>(start: I, end: J) -> Self
    where
        I: IntoIterator<Item = V>,
        J: IntoIterator<Item = W>,
        V: Into<Value>,
        W: Into<Value>,
    {
        KeyRange::Between {
            start: tuple(start),
            end: tuple(end),
        }
    }

    /// Membership in a set of key prefixes.
    pub fn in_set(tuples: Vec<Vec<Value>>) -> Self {
        KeyRange::In(tuples)
    }

    /// Prefix equality with a LIKE pattern on the last value.
    pub fn like<I: IntoIterator<Item = V>, V: Into<Value>>(values: I) -> Self {
        KeyRange::Like(tuple(values))
    }

    /// Operator name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            KeyRange::Eq(_) => "eq",
            KeyRange::Gt(_) => "gt",
            KeyRange::Lt(_) => "lt",
            KeyRange::Ge(_) => "ge",
            KeyRange::Le(_) => "le",
            KeyRange::Between { .. } => "between",
            KeyRange::In(_) => "in",
            KeyRange::Like(_) => "like",
        }
    }

    /// Expand against `key`; `None` means the range can match nothing.
    pub fn to_predicate(&self, key: &CompositeKey) -> Option<Predicate> {
        self.expand(key).ok()
    }

    /// Expand against `key`, reporting why no predicate exists.
    pub(crate) fn expand(&self, key: &CompositeKey) -> Result<Predicate, &'static str> {
        if key.is_empty() {
            return Err("table has no composite key");
        }
        let parts = key.parts();
        match self {
            KeyRange::Eq(values) => {
                let values = check_tuple(parts, values)?;
                Ok(Predicate::and(eq_chain(parts, values)))
            }
            KeyRange::Gt(values) => {
                let values = check_tuple(parts, values)?;
                Ok(lexicographic(parts, values, CompareOp::Gt, CompareOp::Gt))
            }
            KeyRange::Lt(values) => {
                let values = check_tuple(parts, values)?;
                Ok(lexicographic(parts, values, CompareOp::Lt, CompareOp::Lt))
            }
            KeyRange::Ge(values) => {
                let values = check_tuple(parts, values)?;
                Ok(lexicographic(parts, values, CompareOp::Gt, CompareOp::Ge))
            }
            KeyRange::Le(values) => {
                let values = check_tuple(parts, values)?;
                Ok(lexicographic(parts, values, CompareOp::Lt, CompareOp::Le))
            }
            KeyRange::Between { start, end } => {
                let start = check_tuple(parts, start)?;
                let end = check_tuple(parts, end)?;
                if start.len() == 1 && end.len() == 1 {
                    let part = &parts[0];
                    let (low, high) = if part.ascending {
                        (start[0].clone(), end[0].clone())
                    } else {
                        (end[0].clone(), start[0].clone())
                    };
                    return Ok(Predicate::Between {
                        column: part.column.clone(),
                        low,
                        high,
                    });
                }
                Ok(Predicate::and(vec![
                    lexicographic(parts, start, CompareOp::Gt, CompareOp::Ge),
                    lexicographic(parts, end, CompareOp::Lt, CompareOp::Le),
                ]))
            }
            KeyRange::In(tuples) => {
                if tuples.is_empty() {
                    return Err("empty value set");
                }
                for values in tuples {
                    check_tuple(parts, values)?;
                }
                // `IN` never matches NULL, so null members need `IS NULL`.
                if tuples.iter().all(|t| t.len() == 1 && !t[0].is_null()) {
                    return Ok(Predicate::In {
                        column: parts[0].column.clone(),
                        values: tuples.iter().map(|t| t[0].clone()).collect(),
                    });
                }
                Ok(Predicate::or(
                    tuples
                        .iter()
                        .map(|values| Predicate::and(eq_chain(parts, values)))
                        .collect(),
                ))
            }
            KeyRange::Like(values) => {
                let values = check_tuple(parts, values)?;
                let last = values.len() - 1;
                let mut clauses = eq_chain(parts, &values[..last]);
                clauses.push(Predicate::Like {
                    column: parts[last].column.clone(),
                    pattern: values[last].clone(),
                });
                Ok(Predicate::and(clauses))
            }
        }
    }
}

fn check_tuple<'v>(parts: &[KeyPart], values: &'v [Value]) -> Result<&'v [Value], &'static str> {
    if values.is_empty() {
        return Err("empty key tuple");
    }
    if values.len() > parts.len() {
        return Err("key tuple longer than the composite key");
    }
    Ok(values)
}

/// `K1 = v1, ..., Km = vm` for the supplied values.
fn eq_chain(parts: &[KeyPart], values: &[Value]) -> Vec<Predicate> {
    parts
        .iter()
        .zip(values)
        .map(|(part, value)| Predicate::eq(part.column.clone(), value.clone()))
        .collect()
}

/// Operator in key order: mirrored on descending parts.
fn directed(part: &KeyPart, op: CompareOp) -> CompareOp {
    if part.ascending {
        op
    } else {
        op.mirrored()
    }
}

/// `OR` over i of `(K1 = v1 AND ... AND Ki op vi)`; the last clause uses
/// `last`, earlier ones `strict`.
fn lexicographic(
    parts: &[KeyPart],
    values: &[Value],
    strict: CompareOp,
    last: CompareOp,
) -> Predicate {
    let m = values.len();
    let clauses = (0..m)
        .map(|i| {
            let op = if i + 1 == m { last } else { strict };
            let mut conjuncts = eq_chain(parts, &values[..i]);
            conjuncts.push(Predicate::compare(
                parts[i].column.clone(),
                directed(&parts[i], op),
                values[i].clone(),
            ));
            Predicate::and(conjuncts)
        })
        .collect();
    Predicate::or(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CompositeKey {
        CompositeKey::ascending(["region", "id", "line"])
    }

    fn cmp(column: &str, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::compare(column, op, value.into())
    }

    #[test]
    fn test_eq_prefix() {
        let predicate = KeyRange::eq(["E"]).to_predicate(&key()).unwrap();
        assert_eq!(predicate, cmp("region", CompareOp::Eq, "E"));

        let predicate = KeyRange::eq([Value::from("E"), Value::from(7)])
            .to_predicate(&key())
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::And(vec![
                cmp("region", CompareOp::Eq, "E"),
                cmp("id", CompareOp::Eq, 7),
            ])
        );
    }

    #[test]
    fn test_eq_null_component() {
        let predicate = KeyRange::eq([Value::Null]).to_predicate(&key()).unwrap();
        assert_eq!(predicate, Predicate::IsNull { column: "region".into() });
    }

    #[test]
    fn test_gt_expansion() {
        let predicate = KeyRange::gt([Value::from("E"), Value::from(7)])
            .to_predicate(&key())
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                cmp("region", CompareOp::Gt, "E"),
                Predicate::And(vec![
                    cmp("region", CompareOp::Eq, "E"),
                    cmp("id", CompareOp::Gt, 7),
                ]),
            ])
        );
    }

    #[test]
    fn test_ge_uses_inclusive_last_clause_only() {
        let predicate = KeyRange::ge([Value::from("E"), Value::from(7), Value::from(1)])
            .to_predicate(&key())
            .unwrap();
        let Predicate::Or(clauses) = predicate else {
            panic!("expected disjunction");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0], cmp("region", CompareOp::Gt, "E"));
        let Predicate::And(middle) = &clauses[1] else {
            panic!("expected conjunction");
        };
        assert_eq!(middle[1], cmp("id", CompareOp::Gt, 7));
        let Predicate::And(last) = &clauses[2] else {
            panic!("expected conjunction");
        };
        assert_eq!(last[2], cmp("line", CompareOp::Ge, 1));
    }

    #[test]
    fn test_single_value_range() {
        let predicate = KeyRange::le(["M"]).to_predicate(&key()).unwrap();
        assert_eq!(predicate, cmp("region", CompareOp::Le, "M"));
    }

    #[test]
    fn test_descending_part_mirrors_operator() {
        let key = CompositeKey::default().then_asc("region").then_desc("id");
        let predicate = KeyRange::gt([Value::from("E"), Value::from(7)])
            .to_predicate(&key)
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                cmp("region", CompareOp::Gt, "E"),
                Predicate::And(vec![
                    cmp("region", CompareOp::Eq, "E"),
                    cmp("id", CompareOp::Lt, 7),
                ]),
            ])
        );
    }

    #[test]
    fn test_between_collapses_for_one_column() {
        let predicate = KeyRange::between(["A"], ["F"]).to_predicate(&key()).unwrap();
        assert_eq!(
            predicate,
            Predicate::Between {
                column: "region".into(),
                low: "A".into(),
                high: "F".into(),
            }
        );

        let desc = CompositeKey::default().then_desc("id");
        let predicate = KeyRange::between([9], [3]).to_predicate(&desc).unwrap();
        assert_eq!(
            predicate,
            Predicate::Between {
                column: "id".into(),
                low: 3.into(),
                high: 9.into(),
            }
        );
    }

    #[test]
    fn test_between_multi_column_is_ge_and_le() {
        let predicate = KeyRange::between(
            [Value::from("A"), Value::from(1)],
            [Value::from("C"), Value::from(5)],
        )
        .to_predicate(&key())
        .unwrap();
        let Predicate::And(sides) = predicate else {
            panic!("expected conjunction");
        };
        assert_eq!(sides.len(), 2);
        assert!(matches!(&sides[0], Predicate::Or(c) if c.len() == 2));
        assert!(matches!(&sides[1], Predicate::Or(c) if c.len() == 2));
    }

    #[test]
    fn test_in_collapses_to_column_set() {
        let predicate = KeyRange::in_set(vec![vec!["A".into()], vec!["B".into()]])
            .to_predicate(&key())
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                column: "region".into(),
                values: vec!["A".into(), "B".into()],
            }
        );
    }

    #[test]
    fn test_in_with_null_member_uses_is_null() {
        let predicate = KeyRange::in_set(vec![vec![Value::Null], vec!["".into()]])
            .to_predicate(&key())
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                Predicate::IsNull {
                    column: "region".into()
                },
                cmp("region", CompareOp::Eq, ""),
            ])
        );
    }

    #[test]
    fn test_in_multi_column_is_or_of_eq() {
        let predicate = KeyRange::in_set(vec![
            vec!["A".into(), 1.into()],
            vec!["B".into()],
        ])
        .to_predicate(&key())
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                Predicate::And(vec![
                    cmp("region", CompareOp::Eq, "A"),
                    cmp("id", CompareOp::Eq, 1),
                ]),
                cmp("region", CompareOp::Eq, "B"),
            ])
        );
    }

    #[test]
    fn test_like_on_last_component() {
        let predicate = KeyRange::like(["E", "1%"]).to_predicate(&key()).unwrap();
        assert_eq!(
            predicate,
            Predicate::And(vec![
                cmp("region", CompareOp::Eq, "E"),
                Predicate::Like {
                    column: "id".into(),
                    pattern: "1%".into(),
                },
            ])
        );
    }

    #[test]
    fn test_no_predicate_sentinels() {
        let empty_key = CompositeKey::default();
        assert_eq!(KeyRange::eq(["A"]).to_predicate(&empty_key), None);
        assert_eq!(KeyRange::gt(Vec::<Value>::new()).to_predicate(&key()), None);
        assert_eq!(KeyRange::ge([1, 2, 3, 4]).to_predicate(&key()), None);
        assert_eq!(KeyRange::in_set(vec![]).to_predicate(&key()), None);
        assert_eq!(
            KeyRange::between(Vec::<Value>::new(), [1]).to_predicate(&key()),
            None
        );
    }

    #[test]
    fn test_flattening_constructors() {
        let a = cmp("a", CompareOp::Eq, 1);
        let b = cmp("b", CompareOp::Eq, 2);
        let c = cmp("c", CompareOp::Eq, 3);

        let nested = Predicate::and(vec![Predicate::And(vec![a.clone(), b.clone()]), c.clone()]);
        assert_eq!(nested, Predicate::And(vec![a.clone(), b, c]));
        assert_eq!(Predicate::or(vec![a.clone()]), a);
        assert!(!a.is_compound());
    }
}
