//! 워크스페이스 저장 및 연쇄 삭제

use rusqlite::{OptionalExtension, Row};

use super::meta::workspace_meta_keys;
use super::Database;
use crate::error::RaidenError;
use crate::models::Workspace;

fn row_to_workspace(row: &Row<'_>) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        cover: row.get(3)?,
        description: row.get(4)?,
        genre: row.get(5)?,
        source_lang: row.get(6)?,
        target_lang: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const WORKSPACE_COLUMNS: &str =
    "id, title, author, cover, description, genre, source_lang, target_lang, created_at, updated_at";

impl Database {
    /// 워크스페이스 upsert (병합 없이 모든 필드 덮어쓰기)
    ///
    /// `INSERT OR REPLACE`는 행을 지웠다 다시 넣어 FK cascade가 챕터를 날리므로
    /// `ON CONFLICT DO UPDATE`를 사용합니다.
    pub fn put_workspace(&self, ws: &Workspace) -> Result<(), RaidenError> {
        self.conn().execute(
            "INSERT INTO workspaces (id, title, author, cover, description, genre, source_lang, target_lang, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                cover = excluded.cover,
                description = excluded.description,
                genre = excluded.genre,
                source_lang = excluded.source_lang,
                target_lang = excluded.target_lang,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            (
                &ws.id,
                &ws.title,
                &ws.author,
                &ws.cover,
                &ws.description,
                &ws.genre,
                &ws.source_lang,
                &ws.target_lang,
                ws.created_at,
                ws.updated_at,
            ),
        )?;
        Ok(())
    }

    pub fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, RaidenError> {
        let sql = format!("SELECT {} FROM workspaces WHERE id = ?1", WORKSPACE_COLUMNS);
        let ws = self
            .conn()
            .query_row(&sql, [id], row_to_workspace)
            .optional()?;
        Ok(ws)
    }

    /// 최근 갱신 순 워크스페이스 목록
    pub fn list_workspaces(&self) -> Result<Vec<Workspace>, RaidenError> {
        let sql = format!(
            "SELECT {} FROM workspaces ORDER BY updated_at DESC, title ASC",
            WORKSPACE_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let iter = stmt.query_map([], row_to_workspace)?;
        let mut out = Vec::new();
        for ws in iter {
            out.push(ws?);
        }
        Ok(out)
    }

    /// 워크스페이스와 연관 데이터(챕터, 용어집, 읽기 위치, 교정 로그, 워크스페이스 메타) 삭제
    ///
    /// 하나의 트랜잭션으로 실행됩니다. 워크스페이스가 존재했으면 true.
    pub fn delete_workspace_cascade(&self, id: &str) -> Result<bool, RaidenError> {
        self.in_transaction(|tx| {
            tx.execute("DELETE FROM chapters WHERE workspace_id = ?1", [id])?;
            tx.execute("DELETE FROM corrections WHERE workspace_id = ?1", [id])?;
            tx.execute("DELETE FROM dictionary WHERE workspace_id = ?1", [id])?;
            tx.execute("DELETE FROM reading_progress WHERE workspace_id = ?1", [id])?;
            for key in workspace_meta_keys(id) {
                tx.execute("DELETE FROM sync_meta WHERE key = ?1", [&key])?;
            }
            let removed = tx.execute("DELETE FROM workspaces WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}
