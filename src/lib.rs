//! Raiden Reader Core
//!
//! 데스크톱 번역 워크스페이스를 모바일에 미러링하는 리더 코어 라이브러리입니다.
//! 로컬 캐시(SQLite), 텍스트 교정, LAN 피어 탐색과 동기화를 담당합니다.

pub mod commands;
pub mod config;
pub mod corrections;
pub mod db;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod peer;
pub mod reading;
pub mod sync;

use std::path::Path;

use url::Url;

pub use commands::sync::{SyncSession, SyncStatus};
pub use config::SyncConfig;
pub use db::{Database, DbState};
pub use error::{CommandError, CommandResult, RaidenError};
pub use peer::{PeerClient, PeerConnection};
pub use sync::{SyncEngine, SyncProgress, SyncProgressCallback};

/// 앱 데이터 디렉토리 안의 캐시 파일명
pub const DB_FILE_NAME: &str = "raiden.db";

/// 셸이 보관하는 앱 상태
pub struct AppState {
    pub db: DbState,
    pub engine: SyncEngine,
    pub config: SyncConfig,
}

impl AppState {
    /// 설정된 클라이언트 origin으로 동기화 세션 생성
    pub fn sync_session(&self) -> Result<SyncSession, RaidenError> {
        let origin = Url::parse(&self.config.client_origin)
            .map_err(|e| RaidenError::Config(format!("Invalid client origin: {}", e)))?;
        Ok(SyncSession::new(self.engine.clone(), origin))
    }
}

/// 로컬 캐시 열기 + 스키마 초기화
pub fn open_store(data_dir: &Path) -> Result<DbState, RaidenError> {
    let db = Database::new(&data_dir.join(DB_FILE_NAME))?;
    db.initialize()?;
    Ok(DbState::new(db))
}

/// 코어 초기화: 환경 변수 -> 로깅 -> 설정 -> 저장소 -> 동기화 엔진
pub fn bootstrap(data_dir: &Path) -> Result<AppState, RaidenError> {
    config::load_env();
    // 셸이 이미 구독자를 설치했을 수 있음
    let _ = logging::init();

    let config = SyncConfig::from_env()?;
    let db = open_store(data_dir)?;
    let engine = SyncEngine::new(PeerClient::new(config.clone())?);

    tracing::info!(data_dir = %data_dir.display(), peer_port = config.peer_port, "raiden core ready");
    Ok(AppState { db, engine, config })
}
