use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::Result;
use crate::PageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub from_page_id: PageId,
    pub to_page_id: PageId,
    /// Display title of the link. `None` means the link renders as the
    /// target title; an empty string means the pipe trick applies.
    pub title: Option<String>,
}

const GET_PAGE_BY_ID_SQL: &str = "SELECT page_id, title FROM pages WHERE page_id = ?1";
const GET_PAGE_BY_TITLE_SQL: &str = "SELECT page_id, title FROM pages WHERE title = ?1";
const GET_LINK_SQL: &str =
    "SELECT from_page_id, to_page_id, title FROM links WHERE from_page_id = ?1 AND to_page_id = ?2";

/// Accessor for the graph metadata database. This type is thread-safe:
/// the connection and its statement cache are serialized behind an
/// internal lock.
///
/// A missing page or link is a normal `Ok(None)`, never an error.
pub struct MetadataReader {
    conn: Mutex<Connection>,
}

impl MetadataReader {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn page_by_id(&self, id: PageId) -> Result<Option<Page>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(GET_PAGE_BY_ID_SQL)?;
        let page = stmt
            .query_row(params![id], |row| {
                Ok(Page {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })
            .optional()?;
        Ok(page)
    }

    pub fn page_by_title(&self, title: &str) -> Result<Option<Page>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(GET_PAGE_BY_TITLE_SQL)?;
        let page = stmt
            .query_row(params![title], |row| {
                Ok(Page {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })
            .optional()?;
        Ok(page)
    }

    pub fn link(&self, from_page_id: PageId, to_page_id: PageId) -> Result<Option<Link>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(GET_LINK_SQL)?;
        let link = stmt
            .query_row(params![from_page_id, to_page_id], |row| {
                Ok(Link {
                    from_page_id: row.get(0)?,
                    to_page_id: row.get(1)?,
                    title: row.get(2)?,
                })
            })
            .optional()?;
        Ok(link)
    }
}

/// Creates and fills a metadata database. Used by the importer and by
/// tests; the resulting file is only ever read back through
/// [`MetadataReader`].
pub struct MetadataWriter {
    conn: Connection,
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS pages (
    page_id INTEGER PRIMARY KEY,
    title TEXT UNIQUE NOT NULL
);
CREATE TABLE IF NOT EXISTS links (
    from_page_id INTEGER NOT NULL,
    to_page_id INTEGER NOT NULL,
    title TEXT,
    PRIMARY KEY (from_page_id, to_page_id)
) WITHOUT ROWID;
";

impl MetadataWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // The database is written once and then treated as immutable, so
        // durability of intermediate states does not matter.
        conn.pragma_update(None, "journal_mode", "OFF")?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn insert_page(&self, id: PageId, title: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO pages (page_id, title) VALUES (?1, ?2)")?;
        stmt.execute(params![id, title])?;
        Ok(())
    }

    pub fn insert_link(&self, from: PageId, to: PageId, title: Option<&str>) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO links (from_page_id, to_page_id, title) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(params![from, to, title])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_store() -> (tempfile::TempDir, MetadataReader) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wiki.metadata");
        let writer = MetadataWriter::create(&path).unwrap();
        writer.begin().unwrap();
        writer.insert_page(1, "Rust (programming language)").unwrap();
        writer.insert_page(2, "Mozilla").unwrap();
        writer.insert_link(1, 2, None).unwrap();
        writer.insert_link(2, 1, Some("Rust")).unwrap();
        writer.commit().unwrap();
        drop(writer);
        (dir, MetadataReader::open(&path).unwrap())
    }

    #[test]
    fn page_lookups() {
        let (_dir, reader) = sample_store();
        let page = reader.page_by_id(1).unwrap().unwrap();
        assert_eq!(page.title, "Rust (programming language)");
        let page = reader.page_by_title("Mozilla").unwrap().unwrap();
        assert_eq!(page.id, 2);
        assert_eq!(reader.page_by_id(3).unwrap(), None);
        assert_eq!(reader.page_by_title("mozilla").unwrap(), None); // case-sensitive
    }

    #[test]
    fn link_lookups() {
        let (_dir, reader) = sample_store();
        let link = reader.link(1, 2).unwrap().unwrap();
        assert_eq!(link.title, None);
        let link = reader.link(2, 1).unwrap().unwrap();
        assert_eq!(link.title.as_deref(), Some("Rust"));
        assert_eq!(reader.link(1, 3).unwrap(), None);
    }

    #[test]
    fn empty_link_title_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wiki.metadata");
        let writer = MetadataWriter::create(&path).unwrap();
        writer.insert_page(1, "A").unwrap();
        writer.insert_page(2, "B (b)").unwrap();
        writer.insert_link(1, 2, Some("")).unwrap();
        drop(writer);

        let reader = MetadataReader::open(&path).unwrap();
        let link = reader.link(1, 2).unwrap().unwrap();
        // An empty title is distinct from a missing one.
        assert_eq!(link.title.as_deref(), Some(""));
    }
}
