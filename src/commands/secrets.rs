//! Secret 명령어
//!
//! - `protect`: 저장 경로, 실패 시 에러를 그대로 전달 ("설정을 저장할 수 없음")
//! - `reveal`: 읽기 경로, 절대 실패하지 않음
//!
//! PBKDF2 계산이 포함되므로 async 버전은 blocking 스레드에서 실행합니다.

use tracing::warn;

use super::map_join_error;
use crate::error::CommandResult;
use crate::secrets::SecretCodec;

/// 평문 보호
pub fn protect_secret(codec: &SecretCodec, value: String) -> CommandResult<String> {
    Ok(codec.protect(&value)?)
}

/// 저장된 값 복원 (실패 시 빈 문자열)
pub fn reveal_secret(codec: &SecretCodec, stored: String) -> String {
    codec.reveal(&stored)
}

pub async fn protect_secret_async(codec: SecretCodec, value: String) -> CommandResult<String> {
    tokio::task::spawn_blocking(move || protect_secret(&codec, value))
        .await
        .map_err(map_join_error)?
}

pub async fn reveal_secret_async(codec: SecretCodec, stored: String) -> String {
    match tokio::task::spawn_blocking(move || reveal_secret(&codec, stored)).await {
        Ok(plaintext) => plaintext,
        Err(e) => {
            warn!(error = %e, "reveal task failed, treating as unset");
            String::new()
        }
    }
}
