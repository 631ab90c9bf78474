//! Raiden Error Types
//!
//! 코어 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// Raiden 코어 에러
#[derive(Error, Debug)]
pub enum RaidenError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 피어가 2xx 이외의 상태로 응답
    #[error("Peer returned HTTP {status} for {endpoint}")]
    PeerStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// 응답 형식 오류 (JSON 파싱 실패, identity 태그 불일치 등)
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No reachable peer (tried: {})", tried.join(", "))]
    PeerNotFound { tried: Vec<String> },

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Store lock poisoned: {0}")]
    Lock(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RaidenError {
    /// 재시도 가능한 네트워크/프로토콜 계열 에러인지 여부
    ///
    /// Discovery는 이 값이 true이면 다음 후보로 넘어갑니다.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RaidenError::Network(_) | RaidenError::PeerStatus { .. } | RaidenError::Protocol(_)
        )
    }

    /// 사용자 노출용 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            RaidenError::Database(_) => "DB_ERROR",
            RaidenError::Io(_) => "IO_ERROR",
            RaidenError::Serialization(_) => "SERIALIZATION_ERROR",
            RaidenError::Network(_) => "NETWORK_ERROR",
            RaidenError::PeerStatus { .. } => "PEER_HTTP_ERROR",
            RaidenError::Protocol(_) => "PROTOCOL_ERROR",
            RaidenError::PeerNotFound { .. } => "PEER_NOT_FOUND",
            RaidenError::WorkspaceNotFound(_) => "WORKSPACE_NOT_FOUND",
            RaidenError::Lock(_) => "LOCK_ERROR",
            RaidenError::InvalidOperation(_) => "INVALID_OPERATION",
            RaidenError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// 프레젠테이션 레이어 응답용 직렬화 가능한 에러
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CommandError {
    /// 하위 에러를 details에 보존한 채 상위 코드로 감싸기
    ///
    /// "피어 없음" / "가져오기 실패" / "보내기 실패"를 구분하기 위해 사용합니다.
    pub fn wrap(code: &str, message: &str, inner: RaidenError) -> Self {
        CommandError {
            code: code.to_string(),
            message: message.to_string(),
            details: Some(format!("{}: {}", inner.code(), inner)),
        }
    }
}

impl From<RaidenError> for CommandError {
    fn from(error: RaidenError) -> Self {
        let details = match &error {
            RaidenError::PeerStatus { body, .. } if !body.is_empty() => Some(body.clone()),
            _ => None,
        };

        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_status_keeps_body_as_details() {
        let err = RaidenError::PeerStatus {
            endpoint: "/update".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        assert!(err.is_transient());

        let cmd = CommandError::from(err);
        assert_eq!(cmd.code, "PEER_HTTP_ERROR");
        assert!(cmd.message.contains("500"));
        assert_eq!(cmd.details.as_deref(), Some("boom"));
    }

    #[test]
    fn store_errors_are_not_transient() {
        let err = RaidenError::Lock("poisoned".to_string());
        assert!(!err.is_transient());

        let wrapped = CommandError::wrap("PULL_FAILED", "Download failed", err);
        assert_eq!(wrapped.code, "PULL_FAILED");
        assert!(wrapped.details.unwrap().starts_with("LOCK_ERROR"));
    }
}
