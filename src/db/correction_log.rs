//! 교정 로그 (append-only)
//!
//! 생성 후에는 synced 표시나 사용자의 명시적 삭제 외에 수정하지 않습니다.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use super::chapters::clear_dirty;
use super::Database;
use crate::error::RaidenError;
use crate::models::{Correction, CorrectionScope, NewCorrection};

const CORRECTION_COLUMNS: &str =
    "id, workspace_id, old_text, new_text, scope, from_chapter_order, applied_at, synced_to_pc";

fn row_to_correction(row: &Row<'_>) -> rusqlite::Result<Correction> {
    let scope: String = row.get(4)?;
    Ok(Correction {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        old_text: row.get(2)?,
        new_text: row.get(3)?,
        // 스키마 CHECK 제약으로 두 값만 존재
        scope: CorrectionScope::parse(&scope).unwrap_or(CorrectionScope::Chapter),
        from_chapter_order: row.get(5)?,
        applied_at: row.get(6)?,
        synced_to_pc: row.get(7)?,
    })
}

/// 교정 목록 상태 필터
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatusFilter {
    #[default]
    All,
    Pending,
    Pushed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionFilter {
    #[serde(default)]
    pub status: CorrectionStatusFilter,
    /// None이면 전체 워크스페이스
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CorrectionStats {
    pub total: i64,
    pub pending: i64,
    pub pushed: i64,
}

/// 교정 로그 항목 삽입. 정확히 1행이 들어가지 않으면 에러
pub(crate) fn insert_correction(
    conn: &Connection,
    entry: &NewCorrection,
) -> Result<Correction, RaidenError> {
    let inserted = conn.execute(
        "INSERT INTO corrections (workspace_id, old_text, new_text, scope, from_chapter_order, applied_at, synced_to_pc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
        (
            &entry.workspace_id,
            &entry.old_text,
            &entry.new_text,
            entry.scope.as_str(),
            entry.from_chapter_order,
            entry.applied_at,
        ),
    )?;
    if inserted != 1 {
        return Err(RaidenError::InvalidOperation(format!(
            "Correction insert affected {} rows",
            inserted
        )));
    }

    Ok(Correction {
        id: conn.last_insert_rowid(),
        workspace_id: entry.workspace_id.clone(),
        old_text: entry.old_text.clone(),
        new_text: entry.new_text.clone(),
        scope: entry.scope,
        from_chapter_order: entry.from_chapter_order,
        applied_at: entry.applied_at,
        synced_to_pc: false,
    })
}

fn mark_synced(conn: &Connection, ids: &[i64]) -> Result<usize, RaidenError> {
    let mut stmt =
        conn.prepare("UPDATE corrections SET synced_to_pc = 1 WHERE id = ?1 AND synced_to_pc = 0")?;
    let mut changed = 0;
    for id in ids {
        changed += stmt.execute([id])?;
    }
    Ok(changed)
}

impl Database {
    pub fn append_correction(&self, entry: &NewCorrection) -> Result<Correction, RaidenError> {
        insert_correction(self.conn(), entry)
    }

    /// 아직 피어에 보내지 않은 교정 (applied_at 오름차순)
    pub fn query_unsynced_corrections(
        &self,
        workspace_id: Option<&str>,
    ) -> Result<Vec<Correction>, RaidenError> {
        let sql = format!(
            "SELECT {} FROM corrections
             WHERE synced_to_pc = 0 AND (?1 IS NULL OR workspace_id = ?1)
             ORDER BY applied_at ASC, id ASC",
            CORRECTION_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let iter = stmt.query_map([workspace_id], row_to_correction)?;
        let mut out = Vec::new();
        for correction in iter {
            out.push(correction?);
        }
        Ok(out)
    }

    /// synced 표시 (멱등). 실제로 바뀐 행 수를 반환
    pub fn mark_corrections_synced(&self, ids: &[i64]) -> Result<usize, RaidenError> {
        self.in_transaction(|tx| mark_synced(tx, ids))
    }

    /// push 성공 후속 처리: 교정 synced 표시 + 챕터 dirty 해제를 한 트랜잭션으로
    pub fn complete_push(
        &self,
        correction_ids: &[i64],
        chapter_ids: &[i64],
    ) -> Result<(usize, usize), RaidenError> {
        self.in_transaction(|tx| {
            let marked = mark_synced(tx, correction_ids)?;
            let cleaned = clear_dirty(tx, chapter_ids)?;
            Ok((marked, cleaned))
        })
    }

    pub fn pending_corrections_count(&self, workspace_id: Option<&str>) -> Result<i64, RaidenError> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM corrections WHERE synced_to_pc = 0 AND (?1 IS NULL OR workspace_id = ?1)",
            [workspace_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 최신순 교정 목록
    pub fn list_corrections(&self, filter: &CorrectionFilter) -> Result<Vec<Correction>, RaidenError> {
        let status_clause = match filter.status {
            CorrectionStatusFilter::All => "1 = 1",
            CorrectionStatusFilter::Pending => "synced_to_pc = 0",
            CorrectionStatusFilter::Pushed => "synced_to_pc = 1",
        };
        let sql = format!(
            "SELECT {} FROM corrections
             WHERE {} AND (?1 IS NULL OR workspace_id = ?1)
             ORDER BY applied_at DESC, id DESC",
            CORRECTION_COLUMNS, status_clause
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let iter = stmt.query_map([filter.workspace_id.as_deref()], row_to_correction)?;
        let mut out = Vec::new();
        for correction in iter {
            out.push(correction?);
        }
        Ok(out)
    }

    pub fn correction_stats(&self, workspace_id: Option<&str>) -> Result<CorrectionStats, RaidenError> {
        let (total, pushed): (i64, i64) = self.conn().query_row(
            "SELECT COUNT(*), COALESCE(SUM(synced_to_pc), 0) FROM corrections
             WHERE (?1 IS NULL OR workspace_id = ?1)",
            [workspace_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CorrectionStats {
            total,
            pending: total - pushed,
            pushed,
        })
    }

    /// 사용자의 명시적 삭제. 삭제된 행 수를 반환
    pub fn delete_correction(&self, id: i64) -> Result<usize, RaidenError> {
        let removed = self.conn().execute("DELETE FROM corrections WHERE id = ?1", [id])?;
        Ok(removed)
    }

    /// 이미 피어에 보낸 교정 일괄 정리
    pub fn purge_synced_corrections(&self, workspace_id: Option<&str>) -> Result<usize, RaidenError> {
        let removed = self.conn().execute(
            "DELETE FROM corrections WHERE synced_to_pc = 1 AND (?1 IS NULL OR workspace_id = ?1)",
            [workspace_id],
        )?;
        Ok(removed)
    }
}
