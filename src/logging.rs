//! 구조화 로깅 초기화

use crate::error::RaidenError;

/// stderr fmt 구독자 설치. 필터는 `RUST_LOG` (기본 info)
///
/// 이미 설치되어 있으면 `Config` 에러를 반환합니다.
pub fn init() -> Result<(), RaidenError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .map_err(|e| RaidenError::Config(format!("build log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| RaidenError::Config(format!("initialize tracing subscriber: {}", e)))?;

    Ok(())
}
