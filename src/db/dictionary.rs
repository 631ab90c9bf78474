//! 워크스페이스 용어집

use super::Database;
use crate::error::RaidenError;
use crate::models::{DictionaryEntry, DictionaryEntryType};

impl Database {
    /// 용어집 전체 교체 (삭제 후 일괄 삽입, 병합 없음)
    pub fn replace_dictionary(
        &self,
        workspace_id: &str,
        entries: &[DictionaryEntry],
    ) -> Result<usize, RaidenError> {
        self.in_transaction(|tx| {
            tx.execute("DELETE FROM dictionary WHERE workspace_id = ?1", [workspace_id])?;

            let mut stmt = tx.prepare(
                "INSERT INTO dictionary (workspace_id, original, translated, entry_type)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                stmt.execute((
                    workspace_id,
                    &entry.original,
                    &entry.translated,
                    entry.entry_type.as_str(),
                ))?;
            }
            Ok(entries.len())
        })
    }

    pub fn list_dictionary(&self, workspace_id: &str) -> Result<Vec<DictionaryEntry>, RaidenError> {
        let mut stmt = self.conn().prepare(
            "SELECT original, translated, entry_type FROM dictionary
             WHERE workspace_id = ?1 ORDER BY original ASC",
        )?;
        let iter = stmt.query_map([workspace_id], |row| {
            let entry_type: String = row.get(2)?;
            Ok(DictionaryEntry {
                original: row.get(0)?,
                translated: row.get(1)?,
                entry_type: DictionaryEntryType::parse_lossy(&entry_type),
            })
        })?;

        let mut out = Vec::new();
        for entry in iter {
            out.push(entry?);
        }
        Ok(out)
    }
}
