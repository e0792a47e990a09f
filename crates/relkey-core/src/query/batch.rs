//! Batched key fetches.
//!
//! A [`BatchQueryPlanner`] collects key lookups from many call sites and
//! resolves them with a single set-membership query on [`flush`]. Requests
//! return handles immediately; the handles fill in when the planner flushes.
//!
//! ```text
//! request_one(["E", 7]) ─┐
//! request_one(["E", 7]) ─┼─> pending ──flush──> SELECT ... WHERE key IN (...)
//! request_many(["W"])  ──┘                       │
//!                                                └─> rows matched back to handles
//! ```
//!
//! Handles are reference counted with `Rc`, so neither the planner nor its
//! handles leave the thread that created them.
//!
//! [`flush`]: BatchQueryPlanner::flush

use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use relkey_proto::Value;
use tracing::{debug, trace};

use super::predicate::KeyRange;
use super::statement::StatementBuilder;
use crate::catalog::TableDef;
use crate::config::BuilderConfig;
use crate::entity::KeyedEntity;
use crate::error::Error;
use crate::executor::Executor;

/// Resolution state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Waiting for a flush.
    Pending,
    /// At least one row matched.
    Found,
    /// No row matched.
    Missing,
}

#[derive(Debug)]
struct Slot<T> {
    value: RefCell<T>,
    state: Cell<Resolution>,
}

impl<T> Slot<T> {
    fn new(value: T) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
            state: Cell::new(Resolution::Pending),
        })
    }

    fn resolve(&self, state: Resolution) {
        self.state.set(state);
    }

    fn is_pending(&self) -> bool {
        self.state.get() == Resolution::Pending
    }
}

/// Forward reference to a single entity.
///
/// Until the planner flushes, the entity has every column unset. A lookup
/// that matched no row resolves to an entity with every column null.
#[derive(Debug, Clone)]
pub struct EntityHandle {
    slot: Rc<Slot<KeyedEntity>>,
}

impl EntityHandle {
    /// Resolution state.
    pub fn resolution(&self) -> Resolution {
        self.slot.state.get()
    }

    /// Check if the planner has flushed this request.
    pub fn is_resolved(&self) -> bool {
        !self.slot.is_pending()
    }

    /// Borrow the entity.
    pub fn borrow(&self) -> Ref<'_, KeyedEntity> {
        self.slot.value.borrow()
    }

    /// Copy of the entity.
    pub fn get(&self) -> KeyedEntity {
        self.slot.value.borrow().clone()
    }

    /// Check if both handles refer to the same request.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

/// Forward reference to the rows under a key prefix.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    slot: Rc<Slot<Vec<KeyedEntity>>>,
}

impl CollectionHandle {
    /// Resolution state.
    pub fn resolution(&self) -> Resolution {
        self.slot.state.get()
    }

    /// Check if the planner has flushed this request.
    pub fn is_resolved(&self) -> bool {
        !self.slot.is_pending()
    }

    /// Borrow the rows, in key order.
    pub fn borrow(&self) -> Ref<'_, Vec<KeyedEntity>> {
        self.slot.value.borrow()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.slot.value.borrow().len()
    }

    /// Check if no rows are held.
    pub fn is_empty(&self) -> bool {
        self.slot.value.borrow().is_empty()
    }

    /// Copy of the rows.
    pub fn to_vec(&self) -> Vec<KeyedEntity> {
        self.slot.value.borrow().clone()
    }

    /// Check if both handles refer to the same request.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

/// Planner counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerStats {
    /// Requests received, including deduplicated ones.
    pub requests: u64,
    /// Requests answered with an existing pending handle.
    pub deduplicated: u64,
    /// Flushes that had pending work.
    pub flushes: u64,
    /// Queries executed.
    pub queries: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchKind {
    One,
    Many,
}

/// A request waiting for a flush. `tuple` holds the key values after
/// conversion through their column types, which makes it the dedup key.
struct Pending<T> {
    tuple: Vec<Value>,
    slot: Rc<Slot<T>>,
}

/// Collects key lookups against one table and resolves them in one query.
pub struct BatchQueryPlanner {
    table: Arc<TableDef>,
    config: BuilderConfig,
    singles: Vec<Pending<KeyedEntity>>,
    collections: Vec<Pending<Vec<KeyedEntity>>>,
    index: HashMap<(FetchKind, Vec<Value>), usize>,
    poisoned: bool,
    stats: PlannerStats,
}

impl BatchQueryPlanner {
    /// Create a planner for `table`.
    pub fn new(table: Arc<TableDef>, config: BuilderConfig) -> Self {
        Self {
            table,
            config,
            singles: Vec::new(),
            collections: Vec::new(),
            index: HashMap::new(),
            poisoned: false,
            stats: PlannerStats::default(),
        }
    }

    /// The planned table.
    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// Counters since creation.
    pub fn stats(&self) -> PlannerStats {
        self.stats
    }

    /// Number of requests waiting for a flush.
    pub fn pending(&self) -> usize {
        self.singles.len() + self.collections.len()
    }

    /// Check if a flush failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Request the first row whose key starts with `tuple`.
    ///
    /// A value-equal pending request shares its handle. Values are compared
    /// after conversion through their key column's type, so `"007"` on an
    /// integer column matches `7`.
    pub fn request_one<I, V>(&mut self, tuple: I) -> Result<EntityHandle, Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple = self.prepare(tuple)?;
        let key = (FetchKind::One, tuple);
        if let Some(&i) = self.index.get(&key) {
            self.stats.deduplicated += 1;
            trace!(table = %self.table.name, key = ?key.1, "Reusing pending single fetch");
            return Ok(EntityHandle {
                slot: Rc::clone(&self.singles[i].slot),
            });
        }
        let slot = Slot::new(KeyedEntity::new(Arc::clone(&self.table)));
        self.singles.push(Pending {
            tuple: key.1.clone(),
            slot: Rc::clone(&slot),
        });
        self.index.insert(key, self.singles.len() - 1);
        Ok(EntityHandle { slot })
    }

    /// Request every row whose key starts with `prefix`, in key order.
    pub fn request_many<I, V>(&mut self, prefix: I) -> Result<CollectionHandle, Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple = self.prepare(prefix)?;
        let key = (FetchKind::Many, tuple);
        if let Some(&i) = self.index.get(&key) {
            self.stats.deduplicated += 1;
            trace!(table = %self.table.name, key = ?key.1, "Reusing pending collection fetch");
            return Ok(CollectionHandle {
                slot: Rc::clone(&self.collections[i].slot),
            });
        }
        let slot = Slot::new(Vec::new());
        self.collections.push(Pending {
            tuple: key.1.clone(),
            slot: Rc::clone(&slot),
        });
        self.index.insert(key, self.collections.len() - 1);
        Ok(CollectionHandle { slot })
    }

    fn prepare<I, V>(&mut self, tuple: I) -> Result<Vec<Value>, Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if self.poisoned {
            return Err(Error::PlannerPoisoned);
        }
        let tuple: Vec<Value> = tuple.into_iter().map(Into::into).collect();
        let width = self.table.key.len();
        let reason = if width == 0 {
            Some("table has no composite key".to_string())
        } else if tuple.is_empty() {
            Some("empty key tuple".to_string())
        } else if tuple.len() > width {
            Some(format!(
                "{} values for a {}-column key",
                tuple.len(),
                width
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(Error::InvalidKeyTuple {
                table: self.table.name.clone(),
                reason,
            });
        }
        let mut converted = Vec::with_capacity(tuple.len());
        for (column, value) in self.table.key.columns().zip(&tuple) {
            let tag = self.table.require_column(column)?.tag;
            converted.push(tag.coerce(value)?);
        }
        self.stats.requests += 1;
        Ok(converted)
    }

    /// Resolve every pending request with one query.
    ///
    /// Does nothing when no request is pending. On failure the planner is
    /// poisoned and pending handles stay unresolved.
    pub fn flush<E>(&mut self, executor: &mut E) -> Result<(), Error>
    where
        E: Executor + ?Sized,
    {
        if self.poisoned {
            return Err(Error::PlannerPoisoned);
        }
        if self.pending() == 0 {
            return Ok(());
        }
        let result = self.run(executor);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn run<E>(&mut self, executor: &mut E) -> Result<(), Error>
    where
        E: Executor + ?Sized,
    {
        let mut seen = HashSet::new();
        let tuples: Vec<Vec<Value>> = self
            .singles
            .iter()
            .map(|p| &p.tuple)
            .chain(self.collections.iter().map(|p| &p.tuple))
            .filter(|tuple| seen.insert(*tuple))
            .cloned()
            .collect();

        let builder = StatementBuilder::new(&self.table, &self.config);
        let range = KeyRange::In(tuples);
        let predicate = builder.predicate(&range);
        let rows = match predicate {
            Some(predicate) => {
                let statement = builder.select_where(Some(&predicate), None, false)?;
                self.stats.queries += 1;
                executor
                    .fetch(&statement)
                    .map_err(|source| Error::Storage {
                        statement: statement.sql.clone(),
                        source,
                    })?
            }
            None => Vec::new(),
        };

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push(KeyedEntity::from_row(Arc::clone(&self.table), row)?);
        }

        for entity in &entities {
            let keys: Vec<Value> = self
                .table
                .key
                .columns()
                .map(|c| entity.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            for pending in &self.singles {
                if pending.slot.is_pending() && keys.starts_with(&pending.tuple) {
                    *pending.slot.value.borrow_mut() = entity.clone();
                    pending.slot.resolve(Resolution::Found);
                }
            }
            for pending in &self.collections {
                if keys.starts_with(&pending.tuple) {
                    pending.slot.value.borrow_mut().push(entity.clone());
                    pending.slot.resolve(Resolution::Found);
                }
            }
        }

        let mut missing = 0usize;
        for pending in &self.singles {
            if pending.slot.is_pending() {
                *pending.slot.value.borrow_mut() = KeyedEntity::null_filled(Arc::clone(&self.table));
                pending.slot.resolve(Resolution::Missing);
                missing += 1;
            }
        }
        for pending in &self.collections {
            if pending.slot.is_pending() {
                pending.slot.resolve(Resolution::Missing);
                missing += 1;
            }
        }

        self.stats.flushes += 1;
        debug!(
            table = %self.table.name,
            singles = self.singles.len(),
            collections = self.collections.len(),
            rows = rows.len(),
            unresolved = missing,
            "Flushed batched fetch"
        );
        self.singles.clear();
        self.collections.clear();
        self.index.clear();
        Ok(())
    }
}
