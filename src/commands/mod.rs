//! Commands Module
//!
//! 전송 계층(IPC 등)에서 호출하는 명령어 정의

pub mod secrets;
pub mod settings;

use crate::error::CommandError;

/// blocking 작업 join 실패 매핑
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> CommandError {
    CommandError {
        code: "TASK_FAILED".to_string(),
        message: format!("Background task failed: {}", err),
        details: None,
    }
}
