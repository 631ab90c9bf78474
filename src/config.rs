//! Sync Configuration
//!
//! 기본값 + 환경 변수(.env.local / .env) 오버라이드

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::RaidenError;

/// 데스크톱 동기화 서버 고정 포트
pub const DEFAULT_PEER_PORT: u16 = 8888;
/// `/status` 응답의 `app` 값
pub const DEFAULT_IDENTITY_TAG: &str = "raiden";
/// 같은 LAN 탐색 시 쓰는 센티넬 토큰 (실제 인증 아님)
pub const LAN_SENTINEL_TOKEN: &str = "lan";
/// 챕터 청크 크기
pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    pub peer_port: u16,
    pub identity_tag: String,
    pub token: String,
    pub chunk_size: usize,
    pub status_timeout: Duration,
    pub manifest_timeout: Duration,
    pub payload_timeout: Duration,
    pub push_path: String,
    /// 클라이언트 자신의 origin (후보 URL 계산에 사용)
    pub client_origin: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            peer_port: DEFAULT_PEER_PORT,
            identity_tag: DEFAULT_IDENTITY_TAG.to_string(),
            token: LAN_SENTINEL_TOKEN.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            status_timeout: Duration::from_secs(3),
            manifest_timeout: Duration::from_secs(5),
            payload_timeout: Duration::from_secs(30),
            push_path: "/update".to_string(),
            client_origin: "http://localhost".to_string(),
        }
    }
}

impl SyncConfig {
    /// 환경 변수로 기본값 덮어쓰기. 빈 값은 무시
    pub fn from_env() -> Result<Self, RaidenError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, RaidenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("RAIDEN_PEER_PORT") {
            config.peer_port = parse_var("RAIDEN_PEER_PORT", &v)?;
        }
        if let Some(v) = get("RAIDEN_IDENTITY_TAG") {
            config.identity_tag = v;
        }
        if let Some(v) = get("RAIDEN_SYNC_TOKEN") {
            config.token = v;
        }
        if let Some(v) = get("RAIDEN_CHUNK_SIZE") {
            let size: usize = parse_var("RAIDEN_CHUNK_SIZE", &v)?;
            if size == 0 {
                return Err(RaidenError::Config("RAIDEN_CHUNK_SIZE must be positive".to_string()));
            }
            config.chunk_size = size;
        }
        if let Some(v) = get("RAIDEN_STATUS_TIMEOUT_MS") {
            config.status_timeout = Duration::from_millis(parse_var("RAIDEN_STATUS_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("RAIDEN_MANIFEST_TIMEOUT_MS") {
            config.manifest_timeout = Duration::from_millis(parse_var("RAIDEN_MANIFEST_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("RAIDEN_PAYLOAD_TIMEOUT_MS") {
            config.payload_timeout = Duration::from_millis(parse_var("RAIDEN_PAYLOAD_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("RAIDEN_CLIENT_ORIGIN") {
            url::Url::parse(&v)
                .map_err(|e| RaidenError::Config(format!("RAIDEN_CLIENT_ORIGIN is not a URL: {}", e)))?;
            config.client_origin = v;
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, RaidenError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| RaidenError::Config(format!("{} has invalid value '{}': {}", key, value, e)))
}

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

/// .env.local(상위 디렉토리 탐색 포함) -> .env 순으로 로드
///
/// 파일이 없어도 에러가 아닙니다. 이미 설정된 변수는 덮어쓰지 않습니다.
pub fn load_env() {
    if dotenvy::from_filename(".env.local").is_err() {
        if let Some(path) = std::env::current_dir()
            .ok()
            .and_then(|cwd| find_upwards(cwd, ".env.local", 6))
        {
            if let Err(e) = dotenvy::from_path(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to load env file");
            }
        }
    }
    if let Some(e) = unexpected_env_error(dotenvy::dotenv()) {
        tracing::warn!(error = %e, "failed to load .env");
    }
}

/// 파일 없음 이외의 로드 실패 (파싱 에러 등)
fn unexpected_env_error(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}
