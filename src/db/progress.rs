//! 읽기 위치 (워크스페이스당 1행)

use rusqlite::OptionalExtension;

use super::Database;
use crate::error::RaidenError;
use crate::models::ReadingProgress;

/// [0, 1]로 고정. NaN은 0
pub(crate) fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

impl Database {
    pub fn upsert_reading_progress(
        &self,
        workspace_id: &str,
        chapter_order: i64,
        ratio: f64,
    ) -> Result<ReadingProgress, RaidenError> {
        let progress = ReadingProgress {
            workspace_id: workspace_id.to_string(),
            chapter_order,
            ratio: clamp_ratio(ratio),
            updated_at: chrono::Utc::now().timestamp_millis(),
        };

        self.conn().execute(
            "INSERT INTO reading_progress (workspace_id, chapter_order, ratio, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(workspace_id) DO UPDATE SET
                chapter_order = excluded.chapter_order,
                ratio = excluded.ratio,
                updated_at = excluded.updated_at",
            (
                &progress.workspace_id,
                progress.chapter_order,
                progress.ratio,
                progress.updated_at,
            ),
        )?;
        Ok(progress)
    }

    pub fn get_reading_progress(&self, workspace_id: &str) -> Result<Option<ReadingProgress>, RaidenError> {
        let progress = self
            .conn()
            .query_row(
                "SELECT workspace_id, chapter_order, ratio, updated_at
                 FROM reading_progress WHERE workspace_id = ?1",
                [workspace_id],
                |row| {
                    Ok(ReadingProgress {
                        workspace_id: row.get(0)?,
                        chapter_order: row.get(1)?,
                        ratio: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(progress)
    }
}
