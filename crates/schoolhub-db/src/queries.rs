use crate::Database;
use crate::models::{MessageRow, SenderRow, UserRow};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

const USER_COLUMNS: &str = "id, first_name, last_name, grade, login, password, role, created_at";

const MESSAGE_SELECT: &str = "SELECT m.id, m.text,
            m.sender_id, s.first_name, s.last_name,
            m.recipient_id, r.first_name, r.last_name,
            m.status, m.created_at
     FROM messages m
     LEFT JOIN users s ON m.sender_id = s.id
     LEFT JOIN users r ON m.recipient_id = r.id";

pub struct NewUser<'a> {
    pub id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub grade: &'a str,
    pub login: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, grade, login, password, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.first_name,
                    user.last_name,
                    user.grade,
                    user.login,
                    user.password_hash,
                    user.role
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "login = ?1", login))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// The director identity. If several exist, the oldest account wins.
    pub fn find_director(&self) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE role = 'director' ORDER BY created_at, rowid LIMIT 1",
                USER_COLUMNS
            );
            conn.query_row(&sql, (), map_user).optional()
        })
    }

    // -- Messages --

    /// Insert a message with status `sent` and return it joined with user names.
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let created_at = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, text, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', ?5)",
                rusqlite::params![id, sender_id, recipient_id, text, created_at],
            )?;
            query_message(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("message {} vanished after insert", id))
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Move a message to `read`. Already-read messages are left as they are.
    /// Returns `None` if no message has this id.
    pub fn mark_message_read(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET status = 'read' WHERE id = ?1 AND status = 'sent'",
                [id],
            )?;
            query_message(conn, id)
        })
    }

    /// Conversation between two users in both directions, oldest first.
    pub fn get_history(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE (m.sender_id = ?1 AND m.recipient_id = ?2)
                     OR (m.sender_id = ?2 AND m.recipient_id = ?1)
                 ORDER BY m.created_at, m.rowid",
                MESSAGE_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_a, user_b], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Distinct senders of `sent` messages addressed to `recipient_id`,
    /// ordered by their oldest unread message.
    pub fn get_unread_senders(&self, recipient_id: &str) -> Result<Vec<SenderRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.sender_id, u.first_name, u.last_name
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.status = 'sent' AND m.recipient_id = ?1
                 GROUP BY m.sender_id
                 ORDER BY MIN(m.created_at), m.sender_id",
            )?;
            let rows = stmt
                .query_map([recipient_id], |row| {
                    Ok(SenderRow {
                        sender_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let sql = format!("{} WHERE m.id = ?1", MESSAGE_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], map_message).optional()
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        grade: row.get(3)?,
        login: row.get(4)?,
        password: row.get(5)?,
        role: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        sender_id: row.get(2)?,
        sender_first_name: row.get(3)?,
        sender_last_name: row.get(4)?,
        recipient_id: row.get(5)?,
        recipient_first_name: row.get(6)?,
        recipient_last_name: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use schoolhub_types::models::{MessageStatus, Role};
    use uuid::Uuid;

    fn add_user(db: &Database, first: &str, role: Role) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&NewUser {
            id: &id,
            first_name: first,
            last_name: "Test",
            grade: "9B",
            login: &format!("login-{}", id),
            password_hash: "hash",
            role: role.as_str(),
        })
        .unwrap();
        id
    }

    fn send(db: &Database, from: &str, to: &str, text: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, from, to, text, Utc::now()).unwrap();
        id
    }

    #[test]
    fn insert_returns_populated_row() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let dir = add_user(&db, "Dana", Role::Director);

        let id = Uuid::new_v4().to_string();
        let row = db.insert_message(&id, &alice, &dir, "Hello", Utc::now()).unwrap();
        let msg = row.into_chat_message().unwrap();

        assert_eq!(msg.text, "Hello");
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.sender.first_name, "Alice");
        assert_eq!(msg.recipient.first_name, "Dana");
    }

    #[test]
    fn self_addressed_message_is_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let id = Uuid::new_v4().to_string();
        assert!(db.insert_message(&id, &alice, &alice, "me", Utc::now()).is_err());
    }

    #[test]
    fn missing_recipient_falls_back_to_unknown_name() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let ghost = Uuid::new_v4().to_string();

        let id = send(&db, &alice, &ghost, "anyone there?");
        let msg = db.get_message(&id).unwrap().unwrap().into_chat_message().unwrap();
        assert_eq!(msg.recipient.first_name, "unknown");
    }

    #[test]
    fn mark_read_is_idempotent_and_reports_missing() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let dir = add_user(&db, "Dana", Role::Director);
        let id = send(&db, &alice, &dir, "Hello");

        let first = db.mark_message_read(&id).unwrap().unwrap();
        let second = db.mark_message_read(&id).unwrap().unwrap();
        assert_eq!(first.status, "read");
        assert_eq!(second.status, "read");

        assert!(db.mark_message_read(&Uuid::new_v4().to_string()).unwrap().is_none());
    }

    #[test]
    fn history_covers_both_directions_in_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let bob = add_user(&db, "Bob", Role::Student);
        let dir = add_user(&db, "Dana", Role::Director);

        let t0 = Utc::now();
        db.insert_message(&Uuid::new_v4().to_string(), &alice, &dir, "one", t0).unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &dir, &alice, "two", t0 + Duration::seconds(1))
            .unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &bob, &dir, "other", t0).unwrap();

        let texts: Vec<String> = db
            .get_history(&alice, &dir)
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn unread_senders_are_distinct_and_scoped_to_recipient() {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "Alice", Role::Student);
        let bob = add_user(&db, "Bob", Role::Student);
        let dir = add_user(&db, "Dana", Role::Director);
        let other_dir = add_user(&db, "Olga", Role::Director);

        send(&db, &alice, &dir, "1");
        send(&db, &alice, &dir, "2");
        let read = send(&db, &bob, &dir, "3");
        db.mark_message_read(&read).unwrap();
        send(&db, &bob, &other_dir, "4");

        let senders = db.get_unread_senders(&dir).unwrap();
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].sender_id, alice);
    }

    #[test]
    fn oldest_director_wins() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_director().unwrap().is_none());

        add_user(&db, "Alice", Role::Student);
        let first = add_user(&db, "Dana", Role::Director);
        add_user(&db, "Olga", Role::Director);

        assert_eq!(db.find_director().unwrap().unwrap().id, first);
    }
}
