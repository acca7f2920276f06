//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ReportStore trait.

use crate::model::{NoteKind, Record};
use crate::reference::NoteRef;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ReportMeta, ReportStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite report backend
pub struct SqliteReportStore {
    conn: Connection,
}

impl SqliteReportStore {
    /// Creates a new SqliteReportStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteReportStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// A `notes` row before conversion into a [`Record`]
struct StoredRow {
    position: i64,
    note_id: String,
    note_url: String,
    note_type: String,
    user_id: String,
    home_url: String,
    nickname: String,
    avatar: String,
    title: String,
    desc: String,
    liked_count: i64,
    collected_count: i64,
    comment_count: i64,
    share_count: i64,
    video_cover: Option<String>,
    video_addr: Option<String>,
    image_list: String,
    tags: String,
    upload_time: Option<String>,
    ip_location: String,
    fetched_at: String,
}

impl StoredRow {
    fn into_record(self) -> StorageResult<Record> {
        let position = self.position;
        let corrupt = |message: String| StorageError::CorruptRow { position, message };

        let note_url = NoteRef::parse(&self.note_url).map_err(|e| corrupt(e.to_string()))?;
        let note_type = NoteKind::from_db_string(&self.note_type)
            .ok_or_else(|| corrupt(format!("unknown note type '{}'", self.note_type)))?;
        let image_list: Vec<String> =
            serde_json::from_str(&self.image_list).map_err(|e| corrupt(e.to_string()))?;
        let tags: Vec<String> =
            serde_json::from_str(&self.tags).map_err(|e| corrupt(e.to_string()))?;
        let fetched_at = DateTime::parse_from_rfc3339(&self.fetched_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);

        Ok(Record {
            note_id: self.note_id,
            note_url,
            note_type,
            user_id: self.user_id,
            home_url: self.home_url,
            nickname: self.nickname,
            avatar: self.avatar,
            title: self.title,
            desc: self.desc,
            liked_count: self.liked_count.max(0) as u64,
            collected_count: self.collected_count.max(0) as u64,
            comment_count: self.comment_count.max(0) as u64,
            share_count: self.share_count.max(0) as u64,
            video_cover: self.video_cover,
            video_addr: self.video_addr,
            image_list,
            tags,
            upload_time: self.upload_time,
            ip_location: self.ip_location,
            fetched_at,
        })
    }
}

fn to_json(values: &[String]) -> StorageResult<String> {
    serde_json::to_string(values).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl ReportStore for SqliteReportStore {
    fn replace_records(&mut self, name: &str, records: &[Record]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM notes", [])?;
        tx.execute("DELETE FROM report_meta", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO notes (
                    position, note_id, note_url, note_type, user_id, home_url, nickname,
                    avatar, title, description, liked_count, collected_count, comment_count,
                    share_count, video_cover, video_addr, image_list, tags, upload_time,
                    ip_location, fetched_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                          ?16, ?17, ?18, ?19, ?20, ?21)",
            )?;

            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    record.note_id,
                    record.note_url.as_str(),
                    record.note_type.as_str(),
                    record.user_id,
                    record.home_url,
                    record.nickname,
                    record.avatar,
                    record.title,
                    record.desc,
                    clamp_count(record.liked_count),
                    clamp_count(record.collected_count),
                    clamp_count(record.comment_count),
                    clamp_count(record.share_count),
                    record.video_cover,
                    record.video_addr,
                    to_json(&record.image_list)?,
                    to_json(&record.tags)?,
                    record.upload_time,
                    record.ip_location,
                    record.fetched_at.to_rfc3339(),
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO report_meta (id, name, written_at, record_count) VALUES (1, ?1, ?2, ?3)",
            params![name, Utc::now().to_rfc3339(), records.len() as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn load_records(&self) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT position, note_id, note_url, note_type, user_id, home_url, nickname, avatar,
                    title, description, liked_count, collected_count, comment_count,
                    share_count, video_cover, video_addr, image_list, tags, upload_time,
                    ip_location, fetched_at
             FROM notes ORDER BY position",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRow {
                    position: row.get(0)?,
                    note_id: row.get(1)?,
                    note_url: row.get(2)?,
                    note_type: row.get(3)?,
                    user_id: row.get(4)?,
                    home_url: row.get(5)?,
                    nickname: row.get(6)?,
                    avatar: row.get(7)?,
                    title: row.get(8)?,
                    desc: row.get(9)?,
                    liked_count: row.get(10)?,
                    collected_count: row.get(11)?,
                    comment_count: row.get(12)?,
                    share_count: row.get(13)?,
                    video_cover: row.get(14)?,
                    video_addr: row.get(15)?,
                    image_list: row.get(16)?,
                    tags: row.get(17)?,
                    upload_time: row.get(18)?,
                    ip_location: row.get(19)?,
                    fetched_at: row.get(20)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredRow::into_record).collect()
    }

    fn meta(&self) -> StorageResult<Option<ReportMeta>> {
        let meta = self
            .conn
            .query_row(
                "SELECT name, written_at, record_count FROM report_meta WHERE id = 1",
                [],
                |row| {
                    Ok(ReportMeta {
                        name: row.get(0)?,
                        written_at: row.get(1)?,
                        record_count: row.get::<_, i64>(2)?.max(0) as usize,
                    })
                },
            )
            .optional()?;

        Ok(meta)
    }
}
