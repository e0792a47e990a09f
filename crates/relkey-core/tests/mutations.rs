//! Inserts, updates and deletes through SQLite.

#![cfg(feature = "sqlite")]

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use relkey_core::proto::{ExactDecimal, TypeTag, Value};
use relkey_core::{
    ColumnSpec, CompositeKey, Error, ExecutorContext, KeyRange, KeyedEntity, SelectQuery,
    SqliteExecutor, StampRole, TableDef, UnitOfWork,
};

const SCHEMA: &str = "
    CREATE TABLE accounts (
        branch TEXT NOT NULL,
        number INTEGER NOT NULL,
        holder TEXT,
        balance TEXT,
        opened TEXT,
        created_at TEXT,
        created_by TEXT,
        updated_at TEXT,
        updated_by TEXT,
        PRIMARY KEY (branch, number)
    );
";

fn accounts() -> Arc<TableDef> {
    Arc::new(
        TableDef::new("accounts")
            .with_column(ColumnSpec::new("branch", TypeTag::String))
            .with_column(ColumnSpec::new("number", TypeTag::Integer))
            .with_column(ColumnSpec::new("holder", TypeTag::String))
            .with_column(ColumnSpec::new("balance", TypeTag::Decimal).with_default(0))
            .with_column(ColumnSpec::new("opened", TypeTag::Date))
            .with_column(
                ColumnSpec::new("created_at", TypeTag::Timestamp).stamped(StampRole::CreatedAt),
            )
            .with_column(
                ColumnSpec::new("created_by", TypeTag::String).stamped(StampRole::CreatedBy),
            )
            .with_column(
                ColumnSpec::new("updated_at", TypeTag::Timestamp).stamped(StampRole::UpdatedAt),
            )
            .with_column(
                ColumnSpec::new("updated_by", TypeTag::String).stamped(StampRole::UpdatedBy),
            )
            .with_key(CompositeKey::ascending(["branch", "number"])),
    )
}

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn decimal(s: &str) -> Value {
    Value::Decimal(s.parse::<ExactDecimal>().unwrap())
}

fn open_unit(path: &Path, user: &str, day: u32) -> UnitOfWork<SqliteExecutor> {
    let executor = SqliteExecutor::open(path).unwrap();
    UnitOfWork::new(executor, ExecutorContext::new(user, "mutations").at(at(day)))
}

struct TestContext {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    table: Arc<TableDef>,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        let executor = SqliteExecutor::open(&path).unwrap();
        executor.connection().execute_batch(SCHEMA).unwrap();
        Self {
            _dir: dir,
            path,
            table: accounts(),
        }
    }

    fn unit(&self, user: &str, day: u32) -> UnitOfWork<SqliteExecutor> {
        open_unit(&self.path, user, day)
    }

    fn open_account(&self, number: i64, holder: &str, balance: &str) {
        let mut uow = self.unit("teller", 1);
        let mut entity = KeyedEntity::from_values(
            Arc::clone(&self.table),
            [
                ("branch", Value::from("EU")),
                ("number", Value::from(number)),
                ("holder", Value::from(holder)),
                ("balance", decimal(balance)),
            ],
        )
        .unwrap();
        uow.insert(&mut entity).unwrap();
    }

    fn load(&self, uow: &mut UnitOfWork<SqliteExecutor>, number: i64) -> KeyedEntity {
        uow.first(
            &self.table,
            KeyRange::eq([Value::from("EU"), Value::from(number)]),
        )
        .unwrap()
        .unwrap()
    }
}

#[test]
fn test_insert_stamps_and_defaults() {
    let ctx = TestContext::new();
    let mut uow = ctx.unit("alice", 3);

    let mut entity = KeyedEntity::new(Arc::clone(&ctx.table));
    entity.set("branch", "EU").unwrap();
    entity.set("number", 1).unwrap();
    entity.set("opened", "2024-06-03").unwrap();
    assert_eq!(uow.insert(&mut entity).unwrap(), 1);
    assert!(entity.has_baseline());

    let stored = ctx.load(&mut uow, 1);
    assert_eq!(stored.get("balance"), Some(&decimal("0")));
    assert_eq!(
        stored.get("opened"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()))
    );
    assert_eq!(stored.get("created_at"), Some(&Value::Timestamp(at(3))));
    assert_eq!(stored.get("created_by"), Some(&Value::from("alice")));
    assert_eq!(stored.get("updated_by"), Some(&Value::from("alice")));
    assert_eq!(stored.state("holder").map(|s| s.is_null()), Some(true));
}

#[test]
fn test_update_keeps_created_stamps() {
    let ctx = TestContext::new();
    ctx.open_account(7, "Ada", "10.00");

    let mut uow = ctx.unit("bob", 9);
    let mut account = ctx.load(&mut uow, 7);
    account.set("balance", decimal("12.5")).unwrap();
    assert_eq!(uow.update(&mut account).unwrap(), 1);

    let stored = ctx.load(&mut uow, 7);
    assert_eq!(stored.get("balance"), Some(&decimal("12.50")));
    assert_eq!(stored.get("created_by"), Some(&Value::from("teller")));
    assert_eq!(stored.get("created_at"), Some(&Value::Timestamp(at(1))));
    assert_eq!(stored.get("updated_by"), Some(&Value::from("bob")));
    assert_eq!(stored.get("updated_at"), Some(&Value::Timestamp(at(9))));
}

#[test]
fn test_diff_only_guard_skips_row_already_equal() {
    let ctx = TestContext::new();
    ctx.open_account(1, "Ada", "2");

    let mut mine = ctx.unit("alice", 2);
    let mut account = ctx.load(&mut mine, 1);

    // Another unit of work writes the same value first.
    let mut theirs = ctx.unit("bob", 2);
    let mut copy = ctx.load(&mut theirs, 1);
    copy.set("balance", decimal("3")).unwrap();
    assert_eq!(theirs.update(&mut copy).unwrap(), 1);

    account.set("balance", decimal("3")).unwrap();
    let mut diff = UnitOfWork::new(
        mine.into_executor(),
        ExecutorContext::new("alice", "mutations")
            .at(at(2))
            .with_diff_only(true),
    );
    assert_eq!(diff.update(&mut account).unwrap(), 0);

    account.set("balance", decimal("4")).unwrap();
    assert_eq!(diff.update(&mut account).unwrap(), 1);
    assert_eq!(ctx.load(&mut diff, 1).get("balance"), Some(&decimal("4")));
}

#[test]
fn test_diff_only_null_guard() {
    let ctx = TestContext::new();
    ctx.open_account(1, "Ada", "2");

    let executor = SqliteExecutor::open(&ctx.path).unwrap();
    let mut uow = UnitOfWork::new(
        executor,
        ExecutorContext::new("alice", "mutations").with_diff_only(true),
    );
    let mut account = ctx.load(&mut uow, 1);
    account.set_null("holder").unwrap();
    assert_eq!(uow.update(&mut account).unwrap(), 1);

    // Baseline was re-captured: nothing left to write.
    assert_eq!(uow.update(&mut account).unwrap(), 0);
    let stored = ctx.load(&mut uow, 1);
    assert_eq!(stored.state("holder").map(|s| s.is_null()), Some(true));
}

#[test]
fn test_key_change_targets_baseline_row() {
    let ctx = TestContext::new();
    ctx.open_account(1, "Ada", "2");

    let mut uow = ctx.unit("alice", 2);
    let mut account = ctx.load(&mut uow, 1);
    account.set("number", 100).unwrap();
    assert_eq!(uow.update(&mut account).unwrap(), 1);

    assert_eq!(
        uow.count(&ctx.table, Some(&KeyRange::eq([Value::from("EU"), Value::from(1)])))
            .unwrap(),
        0
    );
    assert_eq!(ctx.load(&mut uow, 100).get("holder"), Some(&Value::from("Ada")));
}

#[test]
fn test_missing_key_is_fatal() {
    let ctx = TestContext::new();
    let mut uow = ctx.unit("alice", 2);

    let mut fresh = KeyedEntity::from_values(
        Arc::clone(&ctx.table),
        [("branch", Value::from("EU")), ("number", Value::from(5))],
    )
    .unwrap();
    assert!(matches!(
        uow.update(&mut fresh),
        Err(Error::MissingKeyValue { .. })
    ));
    assert!(matches!(
        uow.delete(&fresh),
        Err(Error::MissingKeyValue { .. })
    ));
}

#[test]
fn test_delete_by_baseline() {
    let ctx = TestContext::new();
    ctx.open_account(1, "Ada", "2");
    ctx.open_account(2, "Grace", "5");

    let mut uow = ctx.unit("alice", 2);
    let mut account = ctx.load(&mut uow, 1);
    account.set("number", 2).unwrap();
    assert_eq!(uow.delete(&account).unwrap(), 1);

    let left = uow.select(&ctx.table, &SelectQuery::all()).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].get("holder"), Some(&Value::from("Grace")));
}

#[test]
fn test_storage_error_carries_statement() {
    let ctx = TestContext::new();
    ctx.open_account(1, "Ada", "2");

    let mut uow = ctx.unit("alice", 2);
    let mut duplicate = KeyedEntity::from_values(
        Arc::clone(&ctx.table),
        [("branch", Value::from("EU")), ("number", Value::from(1))],
    )
    .unwrap();
    match uow.insert(&mut duplicate) {
        Err(Error::Storage { statement, .. }) => {
            assert!(statement.starts_with("INSERT INTO \"accounts\""));
        }
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(!duplicate.has_baseline());
}
