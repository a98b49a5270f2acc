//! 앱 설정 문서
//!
//! 설정은 저장소의 `settings` 레코드에 JSON으로 저장됩니다.
//! 보호 대상 필드(API 키/토큰)는 저장 시 `protect`, 로드 시 `reveal`을 거칩니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SecretError;
use crate::secrets::{SecretCodec, StoredSecret};
use crate::store::KeyStoreHandle;

/// 설정 문서 레코드 이름
pub const SETTINGS_KEY: &str = "settings";

/// 앱 설정
///
/// 보호 대상이 아닌 나머지 설정은 `extra`에 그대로 보존됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// AI 자동완성 API 키 (보호 대상)
    #[serde(default)]
    pub openai_api_key: String,
    /// Git 원격 저장소 액세스 토큰 (보호 대상)
    #[serde(default)]
    pub github_token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSettings {
    fn protected_fields_mut(&mut self) -> [&mut String; 2] {
        [&mut self.openai_api_key, &mut self.github_token]
    }

    /// 보호 대상 필드 중 아직 평문인 것이 있는지
    pub fn has_unprotected_secrets(&self) -> bool {
        [&self.openai_api_key, &self.github_token]
            .iter()
            .any(|v| !v.is_empty() && !StoredSecret::has_marker(v))
    }
}

/// 설정 저장소
#[derive(Clone)]
pub struct SettingsRepository {
    store: KeyStoreHandle,
    codec: SecretCodec,
}

impl SettingsRepository {
    pub fn new(store: KeyStoreHandle, codec: SecretCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    /// 설정 로드 (보호 필드는 평문으로 복원)
    ///
    /// 레코드가 없으면 기본값. 복호화 실패한 필드는 빈 문자열이 됩니다.
    pub fn load(&self) -> Result<AppSettings, SecretError> {
        let Some(raw) = self.store.get(SETTINGS_KEY)? else {
            debug!("no settings document, using defaults");
            return Ok(AppSettings::default());
        };

        let mut settings: AppSettings = serde_json::from_slice(&raw)?;
        for field in settings.protected_fields_mut() {
            *field = self.codec.reveal(field);
        }
        Ok(settings)
    }

    /// 저장된 그대로의 설정 (보호 필드는 인코딩된 상태)
    pub fn load_raw(&self) -> Result<AppSettings, SecretError> {
        match self.store.get(SETTINGS_KEY)? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(AppSettings::default()),
        }
    }

    /// 설정 저장 (보호 필드는 암호화)
    ///
    /// 암호화에 실패하면 아무것도 쓰지 않고 에러를 돌려줍니다.
    pub fn save(&self, settings: &AppSettings) -> Result<(), SecretError> {
        let mut stored = settings.clone();
        for field in stored.protected_fields_mut() {
            *field = self.codec.protect(field)?;
        }

        let bytes = serde_json::to_vec(&stored)?;
        self.store.set(SETTINGS_KEY, &bytes)?;
        debug!("settings document saved");
        Ok(())
    }
}
