//! 외부 키-값 저장소
//!
//! 코어가 요구하는 인터페이스는 `get(key) -> bytes|없음`, `set(key, bytes)` 뿐입니다.
//!
//! - `MemoryStore`: 프로세스 메모리 (테스트/임시용)
//! - `JsonFileStore`: `app_data_dir/<name>.json` 단일 JSON 객체 파일
//! - `KeyringStore`: OS Keychain/키링 (키 이름당 엔트리 1개)

use keyring::Entry;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 저장소 오류
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid value for '{0}': store only accepts UTF-8 text")]
    InvalidValue(String),
}

/// 이름으로 접근하는 blob 저장소
///
/// 구현체는 async 컨텍스트에서 공유되므로 Send + Sync여야 합니다.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// 생성자 주입용 저장소 핸들
pub type KeyStoreHandle = Arc<dyn KeyValueStore>;

// =====================================
// MemoryStore
// =====================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소 장애 시뮬레이션
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 지금까지 성공한 `set` 호출 수
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock()?.insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =====================================
// JsonFileStore
// =====================================

/// 경로별 쓰기 잠금 (같은 파일을 여는 모든 인스턴스가 공유)
static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    let key = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut locks = PATH_LOCKS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}

/// 단일 JSON 객체 파일 저장소
///
/// 값은 문자열로 저장하며, 쓰기는 임시 파일 + rename으로 원자적으로 처리합니다.
/// read-modify-write는 같은 경로의 모든 인스턴스 사이에서 직렬화됩니다.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = path_lock(&path);
        Self { path, write_lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let bytes = serde_json::to_vec_pretty(map)?;

        // Atomic write: 같은 디렉토리의 고유 임시 파일에 쓰고 rename
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.read_map()?;
        match map.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone().into_bytes())),
            Some(other) => Ok(Some(serde_json::to_vec(other)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let text = std::str::from_utf8(value)
            .map_err(|_| StoreError::InvalidValue(key.to_string()))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".to_string()))?;

        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(text.to_string()));
        self.write_map(&map)
    }
}

// =====================================
// KeyringStore
// =====================================

/// OS Keychain 저장소
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, key).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value.into_bytes())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let text = std::str::from_utf8(value)
            .map_err(|_| StoreError::InvalidValue(key.to_string()))?;

        self.entry(key)?
            .set_password(text)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
