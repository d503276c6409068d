//! SQLite-backed member store.
//!
//! Holds the three durable row sets the engine depends on:
//! - `members`: one authoritative record per member
//! - `snapshots`: derived progress, recomputed wholesale each cycle; the
//!   relapse counter is the only field mutated outside a full recompute
//! - `leaderboard_posts`: which message currently displays the board,
//!   unique per (destination, sub-destination)
//!
//! Plus an `audit` trail of member-visible actions. All mutations touch a
//! single row per statement; SQLite's per-connection serialization gives
//! the per-row atomicity the concurrency model in the engine relies on.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::transport::{Destination, MessageId, SubDestination};

/// Opaque, externally assigned member identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative member record.
///
/// `cutoff_date` and `unit_price` are set together on wizard commit or
/// not at all; absence of the cutoff date means "not yet registered".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: Option<String>,
    pub cutoff_date: Option<NaiveDate>,
    pub unit_price: Option<f64>,
    pub is_member: bool,
    pub notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Name used for display and for the deterministic ranking fallback.
    pub fn display_or_id(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Derived progress record. Never authoritative; recomputed each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub member_id: MemberId,
    pub elapsed_days: u32,
    pub saved_total: f64,
    pub relapse_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// Tracked leaderboard message for one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPost {
    pub destination: Destination,
    pub sub_destination: SubDestination,
    pub message_id: MessageId,
    pub updated_at: DateTime<Utc>,
}

/// SQLite member store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the given path, creating schema if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and ephemeral runs).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS members (
                member_id     INTEGER PRIMARY KEY,
                display_name  TEXT,
                cutoff_date   TEXT,
                unit_price    REAL,
                is_member     INTEGER NOT NULL DEFAULT 1,
                notifications INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS snapshots (
                member_id     INTEGER PRIMARY KEY REFERENCES members(member_id),
                elapsed_days  INTEGER NOT NULL DEFAULT 0,
                saved_total   REAL NOT NULL DEFAULT 0,
                relapse_count INTEGER NOT NULL DEFAULT 0,
                updated_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS leaderboard_posts (
                destination     INTEGER NOT NULL,
                sub_destination INTEGER NOT NULL DEFAULT 0,
                message_id      INTEGER NOT NULL,
                updated_at      TEXT NOT NULL,
                PRIMARY KEY (destination, sub_destination)
            );

            CREATE TABLE IF NOT EXISTS audit (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id  INTEGER,
                action     TEXT NOT NULL,
                meta_json  TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_members_is_member ON members(is_member);
            CREATE INDEX IF NOT EXISTS idx_audit_member ON audit(member_id);",
        )?;
        Ok(())
    }

    // ── Members ──────────────────────────────────────────────────────

    pub fn member(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT member_id, display_name, cutoff_date, unit_price,
                        is_member, notifications, created_at, updated_at
                 FROM members WHERE member_id = ?1",
                params![id.0],
                member_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or update a member record.
    ///
    /// `display_name` and `is_member` only overwrite when `Some`; cutoff
    /// date and unit price are written as given (they travel together).
    pub fn upsert_member(
        &self,
        id: MemberId,
        display_name: Option<&str>,
        cutoff_date: Option<NaiveDate>,
        unit_price: Option<f64>,
        is_member: Option<bool>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let existing = self.member(id)?;
        match existing {
            None => {
                self.conn.execute(
                    "INSERT INTO members (member_id, display_name, cutoff_date, unit_price,
                                          is_member, notifications, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                    params![
                        id.0,
                        display_name,
                        cutoff_date,
                        unit_price,
                        is_member.unwrap_or(true),
                        now,
                    ],
                )?;
            }
            Some(prev) => {
                self.conn.execute(
                    "UPDATE members
                     SET display_name = ?2, cutoff_date = ?3, unit_price = ?4,
                         is_member = ?5, updated_at = ?6
                     WHERE member_id = ?1",
                    params![
                        id.0,
                        display_name
                            .map(str::to_owned)
                            .or(prev.display_name),
                        cutoff_date,
                        unit_price,
                        is_member.unwrap_or(prev.is_member),
                        now,
                    ],
                )?;
            }
        }
        Ok(())
    }

    pub fn set_membership(&self, id: MemberId, is_member: bool) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE members SET is_member = ?2, updated_at = ?3 WHERE member_id = ?1",
            params![id.0, is_member, Utc::now()],
        )?;
        Ok(())
    }

    pub fn set_notifications(&self, id: MemberId, enabled: bool) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE members SET notifications = ?2, updated_at = ?3 WHERE member_id = ?1",
            params![id.0, enabled, Utc::now()],
        )?;
        Ok(())
    }

    pub fn list_active_members(&self) -> Result<Vec<Member>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT member_id, display_name, cutoff_date, unit_price,
                    is_member, notifications, created_at, updated_at
             FROM members WHERE is_member = 1 ORDER BY member_id",
        )?;
        let rows = stmt.query_map([], member_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_notification_opt_ins(&self) -> Result<Vec<Member>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT member_id, display_name, cutoff_date, unit_price,
                    is_member, notifications, created_at, updated_at
             FROM members WHERE notifications = 1 ORDER BY member_id",
        )?;
        let rows = stmt.query_map([], member_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn snapshot(&self, id: MemberId) -> Result<Option<ProgressSnapshot>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT member_id, elapsed_days, saved_total, relapse_count, updated_at
                 FROM snapshots WHERE member_id = ?1",
                params![id.0],
                snapshot_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Full overwrite of the derived fields; the relapse counter is
    /// preserved across recomputes.
    pub fn upsert_snapshot(
        &self,
        id: MemberId,
        elapsed_days: u32,
        saved_total: f64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO snapshots (member_id, elapsed_days, saved_total, relapse_count, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)
             ON CONFLICT(member_id) DO UPDATE SET
                 elapsed_days = excluded.elapsed_days,
                 saved_total = excluded.saved_total,
                 updated_at = excluded.updated_at",
            params![id.0, elapsed_days, saved_total, Utc::now()],
        )?;
        Ok(())
    }

    /// Atomically bump the relapse counter and return the new count.
    ///
    /// Creates a zeroed snapshot first if none exists; a relapse may be
    /// the member's first recorded event. Single-statement upsert, so
    /// concurrent reports cannot lose updates.
    pub fn increment_relapse(&self, id: MemberId) -> Result<u32, StoreError> {
        let count = self.conn.query_row(
            "INSERT INTO snapshots (member_id, elapsed_days, saved_total, relapse_count, updated_at)
             VALUES (?1, 0, 0, 1, ?2)
             ON CONFLICT(member_id) DO UPDATE SET
                 relapse_count = relapse_count + 1,
                 updated_at = excluded.updated_at
             RETURNING relapse_count",
            params![id.0, Utc::now()],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    /// Active members joined with their snapshots, ranking input.
    /// Members without a snapshot are not on the board yet.
    pub fn ranked_rows(&self) -> Result<Vec<(Member, ProgressSnapshot)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.member_id, m.display_name, m.cutoff_date, m.unit_price,
                    m.is_member, m.notifications, m.created_at, m.updated_at,
                    s.elapsed_days, s.saved_total, s.relapse_count, s.updated_at
             FROM members m
             JOIN snapshots s ON s.member_id = m.member_id
             WHERE m.is_member = 1",
        )?;
        let rows = stmt.query_map([], |row| {
            let member = member_from_row(row)?;
            let snapshot = ProgressSnapshot {
                member_id: member.id,
                elapsed_days: row.get(8)?,
                saved_total: row.get(9)?,
                relapse_count: row.get(10)?,
                updated_at: row.get(11)?,
            };
            Ok((member, snapshot))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Leaderboard posts ────────────────────────────────────────────

    pub fn leaderboard_post(
        &self,
        destination: Destination,
        sub_destination: SubDestination,
    ) -> Result<Option<LeaderboardPost>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT destination, sub_destination, message_id, updated_at
                 FROM leaderboard_posts
                 WHERE destination = ?1 AND sub_destination = ?2",
                params![destination.0, sub_destination.encode()],
                post_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn set_leaderboard_post(
        &self,
        destination: Destination,
        sub_destination: SubDestination,
        message_id: MessageId,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO leaderboard_posts (destination, sub_destination, message_id, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(destination, sub_destination) DO UPDATE SET
                 message_id = excluded.message_id,
                 updated_at = excluded.updated_at",
            params![destination.0, sub_destination.encode(), message_id.0, Utc::now()],
        )?;
        Ok(())
    }

    // ── Reset & audit ────────────────────────────────────────────────

    /// Purge everything recorded for one member, in one transaction.
    pub fn delete_all_data_for(&self, id: MemberId) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM snapshots WHERE member_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM audit WHERE member_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM members WHERE member_id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    pub fn record_audit(
        &self,
        member: Option<MemberId>,
        action: &str,
        meta: Option<&serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO audit (member_id, action, meta_json, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                member.map(|m| m.0),
                action,
                meta.map(ToString::to_string),
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Most recent audit actions for one member, newest first.
    pub fn recent_audit(&self, id: MemberId, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT action FROM audit WHERE member_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![id.0, limit as i64], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: MemberId(row.get(0)?),
        display_name: row.get(1)?,
        cutoff_date: row.get(2)?,
        unit_price: row.get(3)?,
        is_member: row.get(4)?,
        notifications: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn snapshot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressSnapshot> {
    Ok(ProgressSnapshot {
        member_id: MemberId(row.get(0)?),
        elapsed_days: row.get(1)?,
        saved_total: row.get(2)?,
        relapse_count: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LeaderboardPost> {
    Ok(LeaderboardPost {
        destination: Destination(row.get(0)?),
        sub_destination: SubDestination::decode(row.get(1)?),
        message_id: MessageId(row.get(2)?),
        updated_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn upsert_and_read_member() {
        let db = Database::open_in_memory().unwrap();
        let id = MemberId(42);
        db.upsert_member(id, Some("alice"), Some(date(2024, 5, 1)), Some(250.0), Some(true))
            .unwrap();

        let member = db.member(id).unwrap().unwrap();
        assert_eq!(member.display_name.as_deref(), Some("alice"));
        assert_eq!(member.cutoff_date, Some(date(2024, 5, 1)));
        assert_eq!(member.unit_price, Some(250.0));
        assert!(member.is_member);
        assert!(!member.notifications);
    }

    #[test]
    fn update_keeps_name_when_absent() {
        let db = Database::open_in_memory().unwrap();
        let id = MemberId(1);
        db.upsert_member(id, Some("bob"), None, None, None).unwrap();
        db.upsert_member(id, None, Some(date(2024, 1, 1)), Some(100.0), None)
            .unwrap();

        let member = db.member(id).unwrap().unwrap();
        assert_eq!(member.display_name.as_deref(), Some("bob"));
        assert_eq!(member.cutoff_date, Some(date(2024, 1, 1)));
    }

    #[test]
    fn relapse_counter_creates_zeroed_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let id = MemberId(7);
        assert_eq!(db.increment_relapse(id).unwrap(), 1);
        assert_eq!(db.increment_relapse(id).unwrap(), 2);

        let snap = db.snapshot(id).unwrap().unwrap();
        assert_eq!(snap.elapsed_days, 0);
        assert_eq!(snap.saved_total, 0.0);
        assert_eq!(snap.relapse_count, 2);
    }

    #[test]
    fn snapshot_overwrite_preserves_relapse_count() {
        let db = Database::open_in_memory().unwrap();
        let id = MemberId(7);
        db.increment_relapse(id).unwrap();
        db.upsert_snapshot(id, 10, 2500.0).unwrap();

        let snap = db.snapshot(id).unwrap().unwrap();
        assert_eq!(snap.elapsed_days, 10);
        assert_eq!(snap.saved_total, 2500.0);
        assert_eq!(snap.relapse_count, 1);
    }

    #[test]
    fn ranked_rows_excludes_withdrawn_and_snapshotless() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_member(MemberId(1), Some("a"), Some(date(2024, 1, 1)), Some(1.0), Some(true))
            .unwrap();
        db.upsert_snapshot(MemberId(1), 5, 5.0).unwrap();

        db.upsert_member(MemberId(2), Some("b"), Some(date(2024, 1, 1)), Some(1.0), Some(true))
            .unwrap();
        db.upsert_snapshot(MemberId(2), 9, 9.0).unwrap();
        db.set_membership(MemberId(2), false).unwrap();

        // Registered but never snapshotted.
        db.upsert_member(MemberId(3), Some("c"), None, None, Some(true))
            .unwrap();

        let rows = db.ranked_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.id, MemberId(1));
    }

    #[test]
    fn leaderboard_post_upsert_keeps_one_row() {
        let db = Database::open_in_memory().unwrap();
        let dest = Destination(-100);
        db.set_leaderboard_post(dest, SubDestination::none(), MessageId(11))
            .unwrap();
        db.set_leaderboard_post(dest, SubDestination::none(), MessageId(12))
            .unwrap();

        let post = db.leaderboard_post(dest, SubDestination::none()).unwrap().unwrap();
        assert_eq!(post.message_id, MessageId(12));

        // Distinct sub-destination is a distinct row.
        db.set_leaderboard_post(dest, SubDestination::topic(5), MessageId(20))
            .unwrap();
        let topic_post = db
            .leaderboard_post(dest, SubDestination::topic(5))
            .unwrap()
            .unwrap();
        assert_eq!(topic_post.message_id, MessageId(20));
        let plain = db.leaderboard_post(dest, SubDestination::none()).unwrap().unwrap();
        assert_eq!(plain.message_id, MessageId(12));
    }

    #[test]
    fn delete_all_data_purges_everything() {
        let db = Database::open_in_memory().unwrap();
        let id = MemberId(9);
        db.upsert_member(id, Some("z"), Some(date(2024, 1, 1)), Some(1.0), Some(true))
            .unwrap();
        db.increment_relapse(id).unwrap();
        db.record_audit(Some(id), "register", None).unwrap();

        db.delete_all_data_for(id).unwrap();
        assert!(db.member(id).unwrap().is_none());
        assert!(db.snapshot(id).unwrap().is_none());
        assert!(db.recent_audit(id, 10).unwrap().is_empty());
    }
}
