//! Database Module
//!
//! 로컬 캐시 SQLite 관리. 테이블별 쿼리는 하위 모듈에 `impl Database`로 나뉘어 있습니다.
//! 여러 연산을 하나의 트랜잭션으로 묶어야 하는 호출자(교정 엔진, push 후속 처리)를 위해
//! `&Connection`을 받는 crate 내부 함수도 함께 노출합니다.

mod chapters;
mod correction_log;
mod dictionary;
pub mod meta;
mod progress;
mod schema;
mod workspaces;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};

use crate::error::RaidenError;

pub use correction_log::{CorrectionFilter, CorrectionStats, CorrectionStatusFilter};
pub(crate) use chapters::{chapters_from_order, chapter_by_order, update_chapter_translation};
pub(crate) use correction_log::insert_correction;

/// 데이터베이스 상태 (프레젠테이션 레이어와 동기화 엔진이 공유)
pub struct DbState(pub Mutex<Database>);

impl DbState {
    pub fn new(db: Database) -> Self {
        Self(Mutex::new(db))
    }

    /// 잠금 획득. 잠금은 `.await` 너머로 유지하지 않습니다.
    pub fn lock(&self) -> Result<MutexGuard<'_, Database>, RaidenError> {
        self.0
            .lock()
            .map_err(|e| RaidenError::Lock(format!("Failed to acquire database lock: {}", e)))
    }
}

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> Result<Self, RaidenError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트, 임시 세션용)
    pub fn open_in_memory() -> Result<Self, RaidenError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> Result<(), RaidenError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    /// 클로저를 하나의 트랜잭션으로 실행
    ///
    /// 클로저가 에러를 반환하면 트랜잭션은 drop 시 롤백됩니다.
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T, RaidenError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, RaidenError>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{ChapterStatus, NewChapter, Workspace};

    pub fn memory_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    pub fn workspace(id: &str) -> Workspace {
        Workspace {
            id: id.to_string(),
            title: format!("Title {}", id),
            author: None,
            cover: None,
            description: None,
            genre: None,
            source_lang: Some("zh".to_string()),
            target_lang: Some("vi".to_string()),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    pub fn chapter(order: i64, translated: &str) -> NewChapter {
        NewChapter {
            title: format!("Chapter {}", order),
            title_translated: None,
            content_original: format!("original {}", order),
            content_translated: Some(translated.to_string()),
            order,
            status: ChapterStatus::Translated,
            updated_at: 1_700_000_000_000,
        }
    }

    /// 워크스페이스 + order 1..=n 챕터를 심어둔 DB
    pub fn seeded(ws: &str, texts: &[&str]) -> Database {
        let db = memory_db();
        db.put_workspace(&workspace(ws)).unwrap();
        let chapters: Vec<NewChapter> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| chapter(i as i64 + 1, text))
            .collect();
        db.replace_chapters(ws, &chapters).unwrap();
        db
    }
}
