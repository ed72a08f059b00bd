use async_trait::async_trait;
use referral_types::{Message, MessageFormData};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::MessageRow;
use crate::store::{MessageFilter, MessageStore, SortOrder};

const MESSAGE_COLUMNS: &str = "id, referral_id, sender_id, recipient_id, content, created_at, read";

impl Database {
    // -- Messages --

    pub fn insert_message(&self, form: &MessageFormData) -> StoreResult<Message> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO messages (id, referral_id, sender_id, recipient_id, content)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                rusqlite::params![
                    id,
                    form.referral_id,
                    form.sender_id,
                    form.recipient_id,
                    form.content
                ],
                map_row,
            )?;
            row.into_message()
        })
    }

    pub fn select_messages(
        &self,
        filter: &MessageFilter,
        order: SortOrder,
    ) -> StoreResult<Vec<Message>> {
        self.with_conn(|conn| query_messages(conn, filter, order))
    }

    pub fn set_read(&self, filter: &MessageFilter, read: bool) -> StoreResult<u64> {
        if filter.is_empty() {
            return Err(StoreError::Unfiltered);
        }

        self.with_conn(|conn| {
            let (clause, mut params) = where_clause(filter, 2);
            params.insert(0, Value::Integer(read as i64));
            let sql = format!("UPDATE messages SET read = ?1{clause}");
            let changed = conn.execute(&sql, params_from_iter(params))?;
            Ok(changed as u64)
        })
    }

    pub fn count_messages(&self, filter: &MessageFilter) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let (clause, params) = where_clause(filter, 1);
            let sql = format!("SELECT COUNT(*) FROM messages{clause}");
            let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

fn query_messages(
    conn: &Connection,
    filter: &MessageFilter,
    order: SortOrder,
) -> StoreResult<Vec<Message>> {
    let (clause, params) = where_clause(filter, 1);
    // rowid breaks ties between rows inserted within the same millisecond
    let direction = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages{clause}
         ORDER BY created_at {direction}, rowid {direction}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(MessageRow::into_message).collect()
}

/// Builds ` WHERE a = ?n AND b = ?n+1 ...` with placeholders numbered from
/// `first`, along with the values to bind.
fn where_clause(filter: &MessageFilter, first: usize) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    let mut push = |column: &str, value: Value| {
        clauses.push(format!("{} = ?{}", column, first + params.len()));
        params.push(value);
    };

    if let Some(id) = &filter.id {
        push("id", Value::Text(id.clone()));
    }
    if let Some(referral_id) = filter.referral_id {
        push("referral_id", Value::Integer(referral_id));
    }
    if let Some(recipient_id) = &filter.recipient_id {
        push("recipient_id", Value::Text(recipient_id.clone()));
    }
    if let Some(read) = filter.read {
        push("read", Value::Integer(read as i64));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        referral_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        read: row.get(6)?,
    })
}

/// Runs a blocking query off the async runtime.
async fn blocking<F, T>(db: &Database, f: F) -> StoreResult<T>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking join error: {}", e)))?
}

#[async_trait]
impl MessageStore for Database {
    async fn insert(&self, form: &MessageFormData) -> StoreResult<Message> {
        debug!(referral_id = form.referral_id, "sqlite insert message");
        let form = form.clone();
        blocking(self, move |db| db.insert_message(&form)).await
    }

    async fn select(&self, filter: &MessageFilter, order: SortOrder) -> StoreResult<Vec<Message>> {
        debug!(?filter, ?order, "sqlite select messages");
        let filter = filter.clone();
        blocking(self, move |db| db.select_messages(&filter, order)).await
    }

    async fn set_read(&self, filter: &MessageFilter, read: bool) -> StoreResult<u64> {
        debug!(?filter, read, "sqlite update read flag");
        let filter = filter.clone();
        blocking(self, move |db| Database::set_read(db, &filter, read)).await
    }

    async fn count(&self, filter: &MessageFilter) -> StoreResult<u64> {
        debug!(?filter, "sqlite count messages");
        let filter = filter.clone();
        blocking(self, move |db| db.count_messages(&filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_returns_persisted_row() {
        let db = db();
        let form = MessageFormData::new(42, "u1", "Hello").to("u2");
        let msg = db.insert_message(&form).unwrap();

        assert!(!msg.id.is_empty());
        assert_eq!(msg.referral_id, 42);
        assert_eq!(msg.sender_id, "u1");
        assert_eq!(msg.recipient_id.as_deref(), Some("u2"));
        assert_eq!(msg.content, "Hello");
        assert!(!msg.read);
    }

    #[test]
    fn select_orders_oldest_first() {
        let db = db();
        db.with_conn(|conn| {
            for (id, ts) in [
                ("c", "2024-03-01T10:00:03.000Z"),
                ("a", "2024-03-01T10:00:01.000Z"),
                ("b", "2024-03-01T10:00:02.000Z"),
            ] {
                conn.execute(
                    "INSERT INTO messages (id, referral_id, sender_id, content, created_at)
                     VALUES (?1, 42, 'u1', 'x', ?2)",
                    (id, ts),
                )?;
            }
            Ok(())
        })
        .unwrap();

        let ids: Vec<String> = db
            .select_messages(&MessageFilter::by_referral(42), SortOrder::Ascending)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let newest = db
            .select_messages(&MessageFilter::by_referral(42), SortOrder::Descending)
            .unwrap();
        assert_eq!(newest[0].id, "c");
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let db = db();
        db.with_conn(|conn| {
            for id in ["z", "a", "m"] {
                conn.execute(
                    "INSERT INTO messages (id, referral_id, sender_id, content, created_at)
                     VALUES (?1, 42, 'u1', 'x', '2024-03-01T10:00:00.000Z')",
                    [id],
                )?;
            }
            Ok(())
        })
        .unwrap();

        let ids = |order| -> Vec<String> {
            db.select_messages(&MessageFilter::by_referral(42), order)
                .unwrap()
                .into_iter()
                .map(|m| m.id)
                .collect()
        };
        assert_eq!(ids(SortOrder::Ascending), ["z", "a", "m"]);
        assert_eq!(ids(SortOrder::Descending), ["m", "a", "z"]);
    }

    #[test]
    fn select_ignores_other_referrals() {
        let db = db();
        db.insert_message(&MessageFormData::new(1, "u1", "one")).unwrap();
        db.insert_message(&MessageFormData::new(2, "u1", "two")).unwrap();

        let rows = db
            .select_messages(&MessageFilter::by_referral(2), SortOrder::Ascending)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "two");
        assert!(
            db.select_messages(&MessageFilter::by_referral(3), SortOrder::Ascending)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn set_read_reports_matches() {
        let db = db();
        let msg = db.insert_message(&MessageFormData::new(1, "u1", "hi").to("u2")).unwrap();

        assert_eq!(db.set_read(&MessageFilter::by_id(&msg.id), true).unwrap(), 1);
        // Idempotent: the row still matches the second time
        assert_eq!(db.set_read(&MessageFilter::by_id(&msg.id), true).unwrap(), 1);
        assert_eq!(db.set_read(&MessageFilter::by_id("missing"), true).unwrap(), 0);

        let rows = db
            .select_messages(&MessageFilter::by_id(&msg.id), SortOrder::Ascending)
            .unwrap();
        assert!(rows[0].read);
    }

    #[test]
    fn set_read_requires_filter() {
        let db = db();
        assert!(matches!(
            db.set_read(&MessageFilter::default(), true),
            Err(StoreError::Unfiltered)
        ));
    }

    #[test]
    fn count_unread_for_recipient() {
        let db = db();
        let first = db.insert_message(&MessageFormData::new(1, "u1", "a").to("u2")).unwrap();
        db.insert_message(&MessageFormData::new(1, "u1", "b").to("u2")).unwrap();
        db.insert_message(&MessageFormData::new(1, "u2", "c").to("u1")).unwrap();
        db.insert_message(&MessageFormData::new(1, "system", "d")).unwrap();

        assert_eq!(db.count_messages(&MessageFilter::unread_for("u2")).unwrap(), 2);
        db.set_read(&MessageFilter::by_id(&first.id), true).unwrap();
        assert_eq!(db.count_messages(&MessageFilter::unread_for("u2")).unwrap(), 1);
        assert_eq!(db.count_messages(&MessageFilter::unread_for("nobody")).unwrap(), 0);
        assert_eq!(db.count_messages(&MessageFilter::default()).unwrap(), 4);
    }

    #[tokio::test]
    async fn store_trait_round_trip() {
        let store: &dyn MessageStore = &db();
        let msg = store
            .insert(&MessageFormData::new(9, "u1", "async").to("u2"))
            .await
            .unwrap();
        assert_eq!(store.count(&MessageFilter::unread_for("u2")).await.unwrap(), 1);
        assert_eq!(store.set_read(&MessageFilter::by_id(&msg.id), true).await.unwrap(), 1);
        assert_eq!(store.count(&MessageFilter::unread_for("u2")).await.unwrap(), 0);
        let rows = store
            .select(&MessageFilter::by_referral(9), SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].read);
    }
}
