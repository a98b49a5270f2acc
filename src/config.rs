//! 설정 로딩
//!
//! `.env`(있으면)와 환경변수에서 저장소 위치/백엔드를 읽습니다.
//!
//! - `NOTEVAULT_DATA_DIR`: 설정 파일 디렉토리
//! - `NOTEVAULT_KEY_BACKEND`: 마스터키 저장소 (`file` | `keyring`)
//! - `NOTEVAULT_KEYRING_SERVICE`: Keychain 서비스 이름
//! - `NOTEVAULT_MASTER_KEY_NAME`: 마스터키 예약 이름

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::secrets::MASTER_KEY_NAME;
use crate::store::{JsonFileStore, KeyStoreHandle, KeyringStore};

/// 기본 Keychain 서비스 이름
pub const DEFAULT_KEYRING_SERVICE: &str = "com.notevault.app";

/// 기본 설정 파일 이름
pub const DEFAULT_SETTINGS_FILE: &str = "config.json";

/// 마스터키를 어디에 둘지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBackend {
    /// 설정 파일과 같은 JSON 저장소
    File,
    /// OS Keychain
    Keyring,
}

impl KeyBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "keyring" | "keychain" => Some(Self::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsConfig {
    pub data_dir: PathBuf,
    pub settings_file: String,
    pub key_backend: KeyBackend,
    pub keyring_service: String,
    pub master_key_name: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".notevault"),
            settings_file: DEFAULT_SETTINGS_FILE.to_string(),
            key_backend: KeyBackend::File,
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            master_key_name: MASTER_KEY_NAME.to_string(),
        }
    }
}

/// 두 저장소 핸들 (File 백엔드면 같은 인스턴스를 공유)
#[derive(Clone)]
pub struct Stores {
    pub key_store: KeyStoreHandle,
    pub settings_store: KeyStoreHandle,
}

impl SecretsConfig {
    /// `.env` + 프로세스 환경변수에서 로드
    ///
    /// `.env`가 없어도 실패하지 않습니다.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 로드 (비어 있는 값은 무시)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = var("NOTEVAULT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(backend) = var("NOTEVAULT_KEY_BACKEND") {
            match KeyBackend::parse(&backend) {
                Some(parsed) => config.key_backend = parsed,
                None => warn!(%backend, "unknown key backend, falling back to file"),
            }
        }

        if let Some(service) = var("NOTEVAULT_KEYRING_SERVICE") {
            config.keyring_service = service;
        }

        if let Some(name) = var("NOTEVAULT_MASTER_KEY_NAME") {
            config.master_key_name = name;
        }

        config
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings_file)
    }

    /// 설정/마스터키 저장소 핸들 생성
    pub fn open_stores(&self) -> Stores {
        let settings_store: KeyStoreHandle = Arc::new(JsonFileStore::new(self.settings_path()));

        let key_store: KeyStoreHandle = match self.key_backend {
            KeyBackend::File => settings_store.clone(),
            KeyBackend::Keyring => Arc::new(KeyringStore::new(&self.keyring_service)),
        };

        Stores {
            key_store,
            settings_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SecretsConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SecretsConfig::default());
        assert_eq!(config.master_key_name, "masterKey");
        assert_eq!(config.settings_path(), PathBuf::from(".notevault/config.json"));
    }

    #[test]
    fn test_overrides() {
        let config = SecretsConfig::from_lookup(lookup(&[
            ("NOTEVAULT_DATA_DIR", "/tmp/notes"),
            ("NOTEVAULT_KEY_BACKEND", "Keyring"),
            ("NOTEVAULT_KEYRING_SERVICE", "com.example.notes"),
            ("NOTEVAULT_MASTER_KEY_NAME", "  "),
        ]));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.key_backend, KeyBackend::Keyring);
        assert_eq!(config.keyring_service, "com.example.notes");
        // 빈 값은 무시
        assert_eq!(config.master_key_name, MASTER_KEY_NAME);
    }

    #[test]
    fn test_unknown_backend_falls_back_to_file() {
        let config = SecretsConfig::from_lookup(lookup(&[("NOTEVAULT_KEY_BACKEND", "hsm")]));
        assert_eq!(config.key_backend, KeyBackend::File);
    }

    #[test]
    fn test_file_backend_shares_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = SecretsConfig {
            data_dir: dir.path().to_path_buf(),
            ..SecretsConfig::default()
        };

        let stores = config.open_stores();
        assert!(Arc::ptr_eq(&stores.key_store, &stores.settings_store));

        stores.key_store.set("masterKey", b"a2V5").unwrap();
        assert_eq!(
            stores.settings_store.get("masterKey").unwrap(),
            Some(b"a2V5".to_vec())
        );
    }
}
