//! Report database schema
//!
//! A report file holds exactly one batch: the rows of `notes` in batch order
//! and a single `report_meta` row describing when it was written.

/// SQL schema for a report database
pub const SCHEMA_SQL: &str = r#"
-- One row per fetched note, in batch order
CREATE TABLE IF NOT EXISTS notes (
    position INTEGER PRIMARY KEY,
    note_id TEXT NOT NULL,
    note_url TEXT NOT NULL UNIQUE,
    note_type TEXT NOT NULL,
    user_id TEXT NOT NULL,
    home_url TEXT NOT NULL,
    nickname TEXT NOT NULL,
    avatar TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    liked_count INTEGER NOT NULL DEFAULT 0,
    collected_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    share_count INTEGER NOT NULL DEFAULT 0,
    video_cover TEXT,
    video_addr TEXT,
    image_list TEXT NOT NULL,
    tags TEXT NOT NULL,
    upload_time TEXT,
    ip_location TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id);
CREATE INDEX IF NOT EXISTS idx_notes_type ON notes(note_type);

-- Describes the batch stored in this file
CREATE TABLE IF NOT EXISTS report_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT NOT NULL,
    written_at TEXT NOT NULL,
    record_count INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
