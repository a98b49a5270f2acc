//! Secret Codec - 설정 문서에 저장되는 시크릿 필드의 보호/복원
//!
//! 저장 포맷: `encrypted.<base64(iv ‖ tag ‖ ciphertext)>.<base64(salt)>`
//!
//! - 마커가 없는 값은 평문 (보호 이전에 저장된 값 포함)
//! - `protect`는 이미 보호된 값을 다시 암호화하지 않음
//! - `reveal`은 어떤 실패에도 에러를 내지 않고 빈 문자열을 돌려줌

use std::fmt;

use tracing::warn;

use crate::error::SecretError;
use crate::secrets::cipher::{self, CipherError, SealedSecret};
use crate::secrets::manager::MasterKeyManager;
use crate::store::KeyStoreHandle;

/// 인코딩된 시크릿 마커
pub const ENCODED_MARKER: &str = "encrypted";

/// 세그먼트 구분자
pub const SEPARATOR: char = '.';

/// 설정 필드에 저장된 값의 두 가지 표현
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSecret {
    /// 아직 보호되지 않은 값
    Plaintext(String),
    /// 인코딩된 시크릿
    Encoded { envelope: String, salt: String },
}

impl StoredSecret {
    /// 마커 구조만 확인 (전체 파싱은 하지 않음)
    pub fn has_marker(value: &str) -> bool {
        value
            .strip_prefix(ENCODED_MARKER)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// 저장된 문자열을 한 번 파싱
    ///
    /// 마커는 있는데 세그먼트가 정확히 2개가 아니면 `MalformedInput`.
    pub fn parse(stored: &str) -> Result<Self, CipherError> {
        if !Self::has_marker(stored) {
            return Ok(Self::Plaintext(stored.to_string()));
        }

        let rest = &stored[ENCODED_MARKER.len() + SEPARATOR.len_utf8()..];
        let mut parts = rest.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(envelope), Some(salt), None) if !envelope.is_empty() && !salt.is_empty() => {
                Ok(Self::Encoded {
                    envelope: envelope.to_string(),
                    salt: salt.to_string(),
                })
            }
            _ => Err(CipherError::MalformedInput(
                "expected `encrypted.<envelope>.<salt>`".to_string(),
            )),
        }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded { .. })
    }
}

impl From<SealedSecret> for StoredSecret {
    fn from(sealed: SealedSecret) -> Self {
        Self::Encoded {
            envelope: sealed.envelope,
            salt: sealed.salt,
        }
    }
}

impl fmt::Display for StoredSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(value) => f.write_str(value),
            Self::Encoded { envelope, salt } => {
                write!(f, "{ENCODED_MARKER}{SEPARATOR}{envelope}{SEPARATOR}{salt}")
            }
        }
    }
}

/// Secret Codec
///
/// 호출자는 평문 문자열만 다루고, 인코딩/디코딩은 여기서만 일어납니다.
#[derive(Clone)]
pub struct SecretCodec {
    keys: MasterKeyManager,
}

impl SecretCodec {
    pub fn new(keys: MasterKeyManager) -> Self {
        Self { keys }
    }

    /// 저장소 핸들에서 바로 생성 (기본 마스터키 이름 사용)
    pub fn from_store(store: KeyStoreHandle) -> Self {
        Self::new(MasterKeyManager::new(store))
    }

    pub fn key_manager(&self) -> &MasterKeyManager {
        &self.keys
    }

    /// 평문 보호
    ///
    /// 이미 마커가 있는 값은 그대로 돌려줍니다 (이중 암호화 방지).
    /// 저장소/암호화 오류는 전파합니다.
    pub fn protect(&self, value: &str) -> Result<String, SecretError> {
        if StoredSecret::has_marker(value) {
            return Ok(value.to_string());
        }

        let master = self.keys.get_or_create_master_key()?;
        let sealed = cipher::encrypt(value, &master)?;
        Ok(StoredSecret::from(sealed).to_string())
    }

    /// 저장된 값 복원 (fail-safe)
    ///
    /// 마커가 없으면 그대로, 복호화에 실패하면 빈 문자열을 돌려줍니다.
    pub fn reveal(&self, stored: &str) -> String {
        match self.try_reveal(stored) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "failed to reveal protected secret, treating as unset");
                String::new()
            }
        }
    }

    /// 실패 원인을 그대로 돌려주는 reveal
    pub fn try_reveal(&self, stored: &str) -> Result<String, SecretError> {
        match StoredSecret::parse(stored)? {
            StoredSecret::Plaintext(value) => Ok(value),
            StoredSecret::Encoded { envelope, salt } => {
                let master = self.keys.get_or_create_master_key()?;
                Ok(cipher::decrypt(&envelope, &master, &salt)?)
            }
        }
    }
}
