//! UI languages and string tables.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::locale::{Language, UiStrings};

#[derive(Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// `GET /api/languages`: selectable UI languages, English first.
pub async fn languages() -> Json<Vec<LanguageInfo>> {
    Json(
        Language::ALL
            .iter()
            .map(|l| LanguageInfo {
                code: l.code(),
                name: l.display_name(),
            })
            .collect(),
    )
}

/// `GET /api/locales/:code`: string table for one language.
pub async fn strings(
    State(ctx): State<ApiContext>,
    Path(code): Path<String>,
) -> Result<Json<UiStrings>, ApiError> {
    let language = Language::from_code(&code)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown language: {code}")))?;

    let locales = ctx.locales.clone();
    let strings = tokio::task::spawn_blocking(move || locales.strings(language))
        .await
        .map_err(|e| ApiError::Internal(format!("Locale task failed: {e}")))?;

    Ok(Json(strings))
}
