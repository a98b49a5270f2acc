//! Master Key Manager - 마스터키 수명 관리
//!
//! - 마스터키는 외부 저장소의 예약된 이름(`masterKey`)에 base64로 1개만 저장
//! - 처음 요청될 때 생성하고 즉시 저장, 이후에는 매번 저장소에서 로드
//! - 한 번 저장된 키는 덮어쓰거나 교체하지 않음

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};
use zeroize::{Zeroize, Zeroizing};

use crate::error::SecretError;
use crate::secrets::cipher::{generate_master_key, MasterKey};
use crate::store::KeyStoreHandle;

/// 마스터키 예약 이름
pub const MASTER_KEY_NAME: &str = "masterKey";

/// 최초 생성(check-then-create) 직렬화용 프로세스 전역 잠금
///
/// 키가 이미 있으면 잠금을 잡지 않습니다.
static CREATE_LOCK: Mutex<()> = Mutex::new(());

/// Master Key Manager
///
/// 저장소 핸들은 생성 시 주입받습니다.
#[derive(Clone)]
pub struct MasterKeyManager {
    store: KeyStoreHandle,
    key_name: String,
}

impl MasterKeyManager {
    pub fn new(store: KeyStoreHandle) -> Self {
        Self::with_key_name(store, MASTER_KEY_NAME)
    }

    pub fn with_key_name(store: KeyStoreHandle, key_name: impl Into<String>) -> Self {
        Self {
            store,
            key_name: key_name.into(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// 마스터키 로드 (없으면 생성하고 저장)
    ///
    /// 저장소 오류는 그대로 전파합니다. 메모리 임시 키로 대체하지 않습니다.
    pub fn get_or_create_master_key(&self) -> Result<MasterKey, SecretError> {
        if let Some(key) = self.load_master_key()? {
            return Ok(key);
        }

        let _guard = CREATE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        // 잠금을 기다리는 사이 다른 호출자가 만들었을 수 있음
        if let Some(key) = self.load_master_key()? {
            debug!(key_name = %self.key_name, "master key created by concurrent caller");
            return Ok(key);
        }

        info!(key_name = %self.key_name, "no master key found, generating new one");
        let key = generate_master_key()?;
        let encoded = Zeroizing::new(key.to_base64());
        self.store.set(&self.key_name, encoded.as_bytes())?;
        info!(key_name = %self.key_name, "new master key persisted");

        Ok(key)
    }

    /// 저장소에서 마스터키 로드 (없으면 `None`)
    pub fn load_master_key(&self) -> Result<Option<MasterKey>, SecretError> {
        let Some(mut raw) = self.store.get(&self.key_name)? else {
            return Ok(None);
        };

        let parsed = std::str::from_utf8(&raw)
            .map_err(|_| SecretError::InvalidMasterKey("record is not UTF-8".to_string()))
            .and_then(|text| {
                MasterKey::from_base64(text)
                    .map_err(|e| SecretError::InvalidMasterKey(e.to_string()))
            });
        raw.zeroize();

        parsed.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore, StoreError};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    /// `get`이 느린 저장소 (경쟁 구간 확대용)
    struct SlowStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for SlowStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            thread::sleep(Duration::from_millis(20));
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn test_creates_once_then_loads() {
        let store = Arc::new(MemoryStore::new());
        let manager = MasterKeyManager::new(store.clone());

        let first = manager.get_or_create_master_key().unwrap();
        let second = manager.get_or_create_master_key().unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(store.write_count(), 1);

        let stored = store.get(MASTER_KEY_NAME).unwrap().unwrap();
        assert_eq!(String::from_utf8(stored).unwrap(), first.to_base64());
    }

    #[test]
    fn test_concurrent_first_creation_generates_one_key() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
        });
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                // 인스턴스를 따로 만들어도 생성은 한 번만 일어나야 함
                let manager = MasterKeyManager::new(store.clone());
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.get_or_create_master_key().unwrap().to_base64()
                })
            })
            .collect();

        let keys: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.inner.write_count(), 1);
        assert!(keys.iter().all(|k| k == &keys[0]));
    }

    #[test]
    fn test_store_unavailable_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let manager = MasterKeyManager::new(store.clone());

        let result = manager.get_or_create_master_key();
        assert!(matches!(result, Err(SecretError::StoreUnavailable(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_invalid_record_is_not_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.set(MASTER_KEY_NAME, b"definitely-not-a-key").unwrap();
        let manager = MasterKeyManager::new(store.clone());

        let result = manager.get_or_create_master_key();
        assert!(matches!(result, Err(SecretError::InvalidMasterKey(_))));
        assert_eq!(
            store.get(MASTER_KEY_NAME).unwrap(),
            Some(b"definitely-not-a-key".to_vec())
        );
    }

    #[test]
    fn test_custom_key_name() {
        let store = Arc::new(MemoryStore::new());
        let manager = MasterKeyManager::with_key_name(store.clone(), "notevault:master_key_v1");
        manager.get_or_create_master_key().unwrap();

        assert!(store.get("notevault:master_key_v1").unwrap().is_some());
        assert!(store.get(MASTER_KEY_NAME).unwrap().is_none());
    }
}
