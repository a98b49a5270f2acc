//! Secret 모듈
//!
//! 설정 파일에 저장되는 API 키/토큰을 로컬에서 암호화합니다.
//!
//! - 마스터키 1개만 외부 저장소에 저장 (`masterKey`)
//! - 시크릿마다 새 salt로 PBKDF2 파생키를 만들고 AES-256-GCM으로 암호화
//! - 호출자는 평문 문자열만 다루며 `protect`/`reveal`이 인코딩을 숨김

pub mod cipher;
pub mod codec;
pub mod manager;

pub use cipher::{CipherError, MasterKey, SealedSecret};
pub use codec::{SecretCodec, StoredSecret};
pub use manager::{MasterKeyManager, MASTER_KEY_NAME};
