//! 챕터 저장/조회
//!
//! 챕터는 워크스페이스 단위로 통째로 교체됩니다 (증분 병합 없음).

use rusqlite::{Connection, OptionalExtension, Row};

use super::Database;
use crate::error::RaidenError;
use crate::models::{Chapter, ChapterStatus, NewChapter};

const CHAPTER_COLUMNS: &str = "id, workspace_id, title, title_translated, content_original, \
     content_translated, chapter_order, status, updated_at, is_dirty";

fn row_to_chapter(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    let status: String = row.get(7)?;
    Ok(Chapter {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        title: row.get(2)?,
        title_translated: row.get(3)?,
        content_original: row.get(4)?,
        content_translated: row.get(5)?,
        order: row.get(6)?,
        status: ChapterStatus::parse_lossy(&status),
        updated_at: row.get(8)?,
        is_dirty: row.get(9)?,
    })
}

fn insert_chapters(
    conn: &Connection,
    workspace_id: &str,
    chapters: &[NewChapter],
) -> Result<usize, RaidenError> {
    // id는 AUTOINCREMENT로 새로 할당
    let mut stmt = conn.prepare(
        "INSERT INTO chapters (workspace_id, title, title_translated, content_original,
             content_translated, chapter_order, status, updated_at, is_dirty)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
    )?;
    for chapter in chapters {
        stmt.execute((
            workspace_id,
            &chapter.title,
            &chapter.title_translated,
            &chapter.content_original,
            &chapter.content_translated,
            chapter.order,
            chapter.status.as_str(),
            chapter.updated_at,
        ))?;
    }
    Ok(chapters.len())
}

/// order >= from_order 챕터를 order 오름차순으로 조회
pub(crate) fn chapters_from_order(
    conn: &Connection,
    workspace_id: &str,
    from_order: i64,
) -> Result<Vec<Chapter>, RaidenError> {
    let sql = format!(
        "SELECT {} FROM chapters WHERE workspace_id = ?1 AND chapter_order >= ?2 ORDER BY chapter_order ASC",
        CHAPTER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let iter = stmt.query_map((workspace_id, from_order), row_to_chapter)?;
    let mut out = Vec::new();
    for chapter in iter {
        out.push(chapter?);
    }
    Ok(out)
}

pub(crate) fn chapter_by_order(
    conn: &Connection,
    workspace_id: &str,
    order: i64,
) -> Result<Option<Chapter>, RaidenError> {
    let sql = format!(
        "SELECT {} FROM chapters WHERE workspace_id = ?1 AND chapter_order = ?2",
        CHAPTER_COLUMNS
    );
    let chapter = conn
        .query_row(&sql, (workspace_id, order), row_to_chapter)
        .optional()?;
    Ok(chapter)
}

/// 번역 본문 교체 + dirty 표시
pub(crate) fn update_chapter_translation(
    conn: &Connection,
    chapter_id: i64,
    content_translated: &str,
    updated_at: i64,
) -> Result<usize, RaidenError> {
    let changed = conn.execute(
        "UPDATE chapters SET content_translated = ?1, is_dirty = 1, updated_at = ?2 WHERE id = ?3",
        (content_translated, updated_at, chapter_id),
    )?;
    Ok(changed)
}

impl Database {
    /// 워크스페이스 챕터 전체 교체 (삭제 + 일괄 삽입을 한 트랜잭션으로)
    ///
    /// 다른 리더는 교체 도중의 빈 챕터 집합을 보지 않습니다.
    pub fn replace_chapters(
        &self,
        workspace_id: &str,
        chapters: &[NewChapter],
    ) -> Result<usize, RaidenError> {
        self.in_transaction(|tx| {
            tx.execute("DELETE FROM chapters WHERE workspace_id = ?1", [workspace_id])?;
            insert_chapters(tx, workspace_id, chapters)
        })
    }

    /// 기존 챕터를 지우지 않고 이어서 삽입 (청크 다운로드의 두 번째 청크부터)
    pub fn append_chapters(
        &self,
        workspace_id: &str,
        chapters: &[NewChapter],
    ) -> Result<usize, RaidenError> {
        self.in_transaction(|tx| insert_chapters(tx, workspace_id, chapters))
    }

    pub fn query_chapters_from_order(
        &self,
        workspace_id: &str,
        from_order: i64,
    ) -> Result<Vec<Chapter>, RaidenError> {
        chapters_from_order(self.conn(), workspace_id, from_order)
    }

    /// 워크스페이스 전체 챕터 (order 순)
    pub fn list_chapters(&self, workspace_id: &str) -> Result<Vec<Chapter>, RaidenError> {
        chapters_from_order(self.conn(), workspace_id, i64::MIN)
    }

    pub fn get_chapter_by_order(
        &self,
        workspace_id: &str,
        order: i64,
    ) -> Result<Option<Chapter>, RaidenError> {
        chapter_by_order(self.conn(), workspace_id, order)
    }

    pub fn count_chapters(&self, workspace_id: &str) -> Result<i64, RaidenError> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM chapters WHERE workspace_id = ?1",
            [workspace_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn total_chapter_count(&self) -> Result<i64, RaidenError> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM chapters", [], |row| row.get(0))?;
        Ok(count)
    }

    /// order <= up_to_order 인 챕터 수 (진행률 계산용)
    pub fn count_chapters_up_to(&self, workspace_id: &str, up_to_order: i64) -> Result<i64, RaidenError> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM chapters WHERE workspace_id = ?1 AND chapter_order <= ?2",
            (workspace_id, up_to_order),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn query_dirty_chapters(&self, workspace_id: &str) -> Result<Vec<Chapter>, RaidenError> {
        let sql = format!(
            "SELECT {} FROM chapters WHERE workspace_id = ?1 AND is_dirty = 1 ORDER BY chapter_order ASC",
            CHAPTER_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let iter = stmt.query_map([workspace_id], row_to_chapter)?;
        let mut out = Vec::new();
        for chapter in iter {
            out.push(chapter?);
        }
        Ok(out)
    }

    /// dirty 플래그 해제 (멱등). 실제로 바뀐 행 수를 반환
    pub fn clear_dirty_flags(&self, ids: &[i64]) -> Result<usize, RaidenError> {
        self.in_transaction(|tx| clear_dirty(tx, ids))
    }
}

pub(crate) fn clear_dirty(conn: &Connection, ids: &[i64]) -> Result<usize, RaidenError> {
    let mut stmt = conn.prepare("UPDATE chapters SET is_dirty = 0 WHERE id = ?1 AND is_dirty = 1")?;
    let mut changed = 0;
    for id in ids {
        changed += stmt.execute([id])?;
    }
    Ok(changed)
}
