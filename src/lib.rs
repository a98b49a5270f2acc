//! NoteVault - 노트 앱 설정용 로컬 시크릿 암호화
//!
//! 설정 파일에 저장되는 API 키/토큰을 AES-256-GCM으로 보호합니다.
//! 나머지 앱 코드는 평문 문자열만 다루고, `protect`/`reveal`이 인코딩을 숨깁니다.

pub mod commands;
pub mod config;
pub mod error;
pub mod secrets;
pub mod settings;
pub mod store;

pub use config::SecretsConfig;
pub use error::{CommandError, CommandResult, SecretError};
pub use secrets::{SecretCodec, StoredSecret};
pub use settings::{AppSettings, SettingsRepository};

use crate::secrets::MasterKeyManager;

/// 설정에서 저장소/코덱을 구성하고 설정 저장소를 돌려줌
pub fn open(config: &SecretsConfig) -> SettingsRepository {
    let stores = config.open_stores();
    let keys = MasterKeyManager::with_key_name(stores.key_store, &config.master_key_name);
    SettingsRepository::new(stores.settings_store, SecretCodec::new(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, KeyValueStore};
    use tempfile::tempdir;

    #[test]
    fn test_open_file_backend_end_to_end() {
        let dir = tempdir().unwrap();
        let config = SecretsConfig {
            data_dir: dir.path().to_path_buf(),
            ..SecretsConfig::default()
        };

        let repo = open(&config);
        let settings = AppSettings {
            openai_api_key: "sk-ABC123".to_string(),
            ..AppSettings::default()
        };
        repo.save(&settings).unwrap();

        // 파일에는 마스터키 + 인코딩된 설정만 존재
        let file = JsonFileStore::new(config.settings_path());
        assert!(file.get("masterKey").unwrap().is_some());
        let raw = std::fs::read_to_string(config.settings_path()).unwrap();
        assert!(!raw.contains("sk-ABC123"));

        // 재시작 후에도 복호화 가능
        let reopened = open(&config);
        assert_eq!(reopened.load().unwrap(), settings);
    }

    #[test]
    fn test_concurrent_handles_keep_master_key() {
        for _ in 0..5 {
            let dir = tempdir().unwrap();
            let config = SecretsConfig {
                data_dir: dir.path().to_path_buf(),
                ..SecretsConfig::default()
            };

            let writer = open(&config);
            let saver = open(&config);

            // 이미 보호된 값만 저장하므로 saver는 마스터키를 만들지 않음
            let encoded = AppSettings {
                openai_api_key: "encrypted.ZW52.c2FsdA==".to_string(),
                github_token: "encrypted.ZW52.c2FsdA==".to_string(),
                ..AppSettings::default()
            };
            let saving = std::thread::spawn(move || {
                for _ in 0..100 {
                    saver.save(&encoded).unwrap();
                }
            });
            let protected = writer.codec().protect("sk-ABC123").unwrap();
            saving.join().unwrap();

            let file = JsonFileStore::new(config.settings_path());
            assert!(file.get("masterKey").unwrap().is_some());
            assert_eq!(open(&config).codec().reveal(&protected), "sk-ABC123");
        }
    }
}
