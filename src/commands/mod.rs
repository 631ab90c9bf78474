//! Commands Module
//!
//! 프레젠테이션 레이어에서 호출하는 명령어 정의. 모든 명령은 `CommandResult`를 반환합니다.

pub mod corrections;
pub mod library;
pub mod reading;
pub mod sync;
