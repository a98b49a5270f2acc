//! Settings 명령어

use super::map_join_error;
use crate::error::CommandResult;
use crate::settings::{AppSettings, SettingsRepository};

/// 설정 로드 (보호 필드는 평문)
pub async fn load_settings(repo: SettingsRepository) -> CommandResult<AppSettings> {
    tokio::task::spawn_blocking(move || repo.load())
        .await
        .map_err(map_join_error)?
        .map_err(Into::into)
}

/// 설정 저장 (보호 필드는 암호화)
pub async fn save_settings(repo: SettingsRepository, settings: AppSettings) -> CommandResult<()> {
    tokio::task::spawn_blocking(move || repo.save(&settings))
        .await
        .map_err(map_join_error)?
        .map_err(Into::into)
}
