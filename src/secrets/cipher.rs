//! 암호 프리미티브 (AES-256-GCM + PBKDF2-HMAC-SHA256)
//!
//! 저장소나 설정에 대해 아무것도 모르는 stateless 함수 모음입니다.
//!
//! Envelope 포맷:
//! - `base64(iv ‖ tag ‖ ciphertext)`
//! - iv: 16 bytes, tag: 16 bytes
//! - salt는 별도로 `base64(32 bytes)`

use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// 마스터키 길이 (256-bit)
pub const MASTER_KEY_LEN: usize = 32;

/// 파생키 길이 (256-bit)
pub const DERIVED_KEY_LEN: usize = 32;

/// Salt 길이
pub const SALT_LEN: usize = 32;

/// IV 길이 (AES-GCM, 128-bit nonce)
pub const IV_LEN: usize = 16;

/// 인증 태그 길이
pub const TAG_LEN: usize = 16;

/// PBKDF2 반복 횟수
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// 16-byte nonce를 사용하는 AES-256-GCM
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// 암호 프리미티브 오류
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Authentication failed (wrong key, wrong salt or tampered data)")]
    AuthenticationFailed,

    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// 설치당 1개만 존재하는 마스터키 (drop 시 zeroize)
#[derive(Clone)]
pub struct MasterKey {
    bytes: Zeroizing<[u8; MASTER_KEY_LEN]>,
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// 저장소 표현(base64)에서 복원
    pub fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        let mut decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| CipherError::MalformedInput(format!("master key: {}", e)))?;

        if decoded.len() != MASTER_KEY_LEN {
            let len = decoded.len();
            decoded.zeroize();
            return Err(CipherError::MalformedInput(format!(
                "master key: expected {} bytes, got {}",
                MASTER_KEY_LEN, len
            )));
        }

        let mut bytes = [0u8; MASTER_KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes[..])
    }

    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// 암호화 1회의 결과 (둘 다 있어야 복호화 가능)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    /// `base64(iv ‖ tag ‖ ciphertext)`
    pub envelope: String,
    /// `base64(salt)`
    pub salt: String,
}

/// iv/tag/ciphertext 분리된 envelope
struct Envelope {
    iv: [u8; IV_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(IV_LEN + TAG_LEN + self.ciphertext.len());
        raw.extend_from_slice(&self.iv);
        raw.extend_from_slice(&self.tag);
        raw.extend_from_slice(&self.ciphertext);
        BASE64.encode(raw)
    }

    fn decode(encoded: &str) -> Result<Self, CipherError> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::MalformedInput(format!("envelope: {}", e)))?;

        if raw.len() < IV_LEN + TAG_LEN {
            return Err(CipherError::MalformedInput(format!(
                "envelope: expected at least {} bytes, got {}",
                IV_LEN + TAG_LEN,
                raw.len()
            )));
        }

        let mut iv = [0u8; IV_LEN];
        let mut tag = [0u8; TAG_LEN];
        iv.copy_from_slice(&raw[..IV_LEN]);
        tag.copy_from_slice(&raw[IV_LEN..IV_LEN + TAG_LEN]);

        Ok(Self {
            iv,
            tag,
            ciphertext: raw[IV_LEN + TAG_LEN..].to_vec(),
        })
    }
}

/// CSPRNG로 버퍼 채우기 (실패 시 약한 소스로 대체하지 않음)
fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<(), CipherError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| CipherError::EntropyUnavailable(e.to_string()))
}

/// 새 마스터키 생성 (OS CSPRNG)
pub fn generate_master_key() -> Result<MasterKey, CipherError> {
    generate_master_key_with(&mut OsRng)
}

pub(crate) fn generate_master_key_with<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<MasterKey, CipherError> {
    let mut bytes = [0u8; MASTER_KEY_LEN];
    fill_random(rng, &mut bytes)?;
    let key = MasterKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// PBKDF2-HMAC-SHA256으로 작업별 키 파생
///
/// 결정적: 같은 마스터키와 salt는 항상 같은 키를 만듭니다.
pub fn derive_key(master: &MasterKey, salt: &[u8]) -> Zeroizing<[u8; DERIVED_KEY_LEN]> {
    let mut derived = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    pbkdf2_hmac::<Sha256>(
        master.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        &mut derived[..],
    );
    derived
}

/// 평문 암호화
///
/// 호출마다 새 salt와 IV를 사용하므로 같은 평문도 매번 다른 결과가 나옵니다.
pub fn encrypt(plaintext: &str, master: &MasterKey) -> Result<SealedSecret, CipherError> {
    seal_bytes(plaintext.as_bytes(), master, &mut OsRng)
}

/// 임의 바이트 암호화 (salt/IV는 주어진 RNG에서)
pub(crate) fn seal_bytes<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    master: &MasterKey,
    rng: &mut R,
) -> Result<SealedSecret, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    fill_random(rng, &mut salt)?;
    fill_random(rng, &mut iv)?;

    let key = derive_key(master, &salt);
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(&key[..]));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    let envelope = Envelope {
        iv,
        tag: tag_bytes,
        ciphertext: buffer,
    };

    Ok(SealedSecret {
        envelope: envelope.encode(),
        salt: BASE64.encode(salt),
    })
}

/// envelope + salt 복호화
///
/// 태그 검증에 실패하면 평문을 일부라도 돌려주지 않습니다.
pub fn decrypt(envelope: &str, master: &MasterKey, salt: &str) -> Result<String, CipherError> {
    let envelope = Envelope::decode(envelope)?;
    let salt = BASE64
        .decode(salt)
        .map_err(|e| CipherError::MalformedInput(format!("salt: {}", e)))?;

    let key = derive_key(master, &salt);
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(&key[..]));

    let mut buffer = envelope.ciphertext;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&envelope.iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(&envelope.tag),
        )
        .map_err(|_| {
            buffer.zeroize();
            CipherError::AuthenticationFailed
        })?;

    String::from_utf8(buffer).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CipherError::InvalidUtf8
    })
}
