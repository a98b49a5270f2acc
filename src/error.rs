//! NoteVault Error Types
//!
//! 크레이트 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

use crate::secrets::cipher::CipherError;
use crate::store::StoreError;

/// 시크릿 보호/키 관리 에러
///
/// `protect`와 마스터키 경로에서만 호출자에게 전파됩니다.
/// `reveal`은 이 에러를 밖으로 내보내지 않습니다.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Invalid master key record: {0}")]
    InvalidMasterKey(String),

    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<SecretError> for CommandError {
    fn from(error: SecretError) -> Self {
        let code = match &error {
            SecretError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            SecretError::InvalidMasterKey(_) => "INVALID_MASTER_KEY",
            SecretError::Cipher(CipherError::EntropyUnavailable(_)) => "ENTROPY_UNAVAILABLE",
            SecretError::Cipher(_) => "ENCRYPTION_ERROR",
            SecretError::Serialization(_) => "SERIALIZATION_ERROR",
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_codes() {
        let err: CommandError =
            SecretError::StoreUnavailable(StoreError::Unavailable("offline".into())).into();
        assert_eq!(err.code, "STORE_UNAVAILABLE");
        assert!(err.message.contains("offline"));

        let err: CommandError =
            SecretError::Cipher(CipherError::EntropyUnavailable("no rng".into())).into();
        assert_eq!(err.code, "ENTROPY_UNAVAILABLE");

        let err: CommandError = SecretError::InvalidMasterKey("bad".into()).into();
        assert_eq!(err.code, "INVALID_MASTER_KEY");
    }
}
