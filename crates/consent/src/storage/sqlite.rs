//! SQLite-based ledger storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use log::warn;
use rusqlite::{Connection, params};
use rusqlite_migration::{M, Migrations};

use super::{Ledger, LedgerStore};
use crate::models::Email;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE ledger (
                email TEXT PRIMARY KEY NOT NULL,
                unsubscribed INTEGER NOT NULL
            );
            "#,
        ),
    ])
}

/// SQLite-based ledger
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open ledger at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // WAL keeps readers (e.g. `consent-sync ledger`) unblocked while a
        // run is writing; NORMAL sync is safe under WAL.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run ledger migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("ledger connection lock poisoned"))
    }

    /// Run a write statement that must touch exactly one row
    fn execute_one(&self, sql: &str, params: impl rusqlite::Params, email: &Email) -> Result<()> {
        let changed = self
            .conn()?
            .execute(sql, params)
            .with_context(|| format!("Ledger write failed for {email}"))?;
        if changed != 1 {
            bail!("ledger has no entry for {email}");
        }
        Ok(())
    }
}

impl LedgerStore for SqliteLedger {
    fn get_all(&self) -> Result<Ledger> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT email, unsubscribed FROM ledger")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ledger = Ledger::new();
        for (raw, unsubscribed) in rows {
            match Email::parse(&raw) {
                Some(email) => {
                    ledger.insert(email, unsubscribed);
                }
                None => warn!("[LEDGER] Ignoring unusable email row {:?}", raw),
            }
        }
        Ok(ledger)
    }

    fn insert(&self, email: &Email, unsubscribed: bool) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO ledger (email, unsubscribed) VALUES (?1, ?2)",
                params![email.as_str(), unsubscribed],
            )
            .with_context(|| format!("Ledger insert failed for {email}"))?;
        Ok(())
    }

    fn update(&self, email: &Email, unsubscribed: bool) -> Result<()> {
        self.execute_one(
            "UPDATE ledger SET unsubscribed = ?1 WHERE email = ?2",
            params![unsubscribed, email.as_str()],
            email,
        )
    }

    fn delete(&self, email: &Email) -> Result<()> {
        self.execute_one(
            "DELETE FROM ledger WHERE email = ?1",
            params![email.as_str()],
            email,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_crud() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.insert(&email("a@x.com"), false).unwrap();
        ledger.insert(&email("b@x.com"), true).unwrap();

        ledger.update(&email("a@x.com"), true).unwrap();
        ledger.delete(&email("b@x.com")).unwrap();

        let all = ledger.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get(&email("a@x.com")), Some(&true));
    }

    #[test]
    fn test_strict_writes() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.insert(&email("a@x.com"), false).unwrap();

        assert!(ledger.insert(&email("a@x.com"), true).is_err());
        assert!(ledger.update(&email("missing@x.com"), true).is_err());
        assert!(ledger.delete(&email("missing@x.com")).is_err());
    }

    #[test]
    fn test_email_with_quote_is_stored_verbatim() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let tricky = email("o'brien@x.com");
        ledger.insert(&tricky, true).unwrap();
        assert_eq!(ledger.get_all().unwrap().get(&tricky), Some(&true));
    }
}
