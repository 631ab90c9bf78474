//! 데스크톱 피어 연동 모듈
//!
//! LAN(또는 터널) 너머의 데스크톱 동기화 서버와 HTTP/JSON으로 통신합니다.

pub mod client;
pub mod types;

pub use client::{PeerClient, PeerConnection};
