//! Event info loader: resolves the active talk code and fetches its metadata once.

use crate::api::{AttendanceApi, TalkRecord};
use crate::error::{ApiError, TalkError};
use reqwest::Url;
use tracing::{debug, info, warn};

/// Shown in place of a talk code that was never provided
pub const NO_CODE: &str = "no-code";

/// Query keys that may carry the talk code in a kiosk link, in priority order
pub const CODE_QUERY_KEYS: [&str; 2] = ["c", "codigo"];

/// Resolve the talk code from an explicit `--code` or from a link's query string
pub fn resolve_code(code: Option<&str>, link: Option<&str>) -> Result<String, TalkError> {
    if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
        return Ok(code.to_string());
    }

    let Some(link) = link else {
        return Err(TalkError::MissingCode);
    };
    let url = Url::parse(link.trim()).map_err(|e| {
        warn!("Ignoring unparseable kiosk link {:?}: {}", link, e);
        TalkError::MissingCode
    })?;

    CODE_QUERY_KEYS
        .iter()
        .find_map(|key| {
            url.query_pairs()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .ok_or(TalkError::MissingCode)
}

/// `Code: <code>` label, with the placeholder when no code was given
pub fn pill_text(code: Option<&str>) -> String {
    format!("Code: {}", code.unwrap_or(NO_CODE))
}

/// Loaded, active talk ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkInfo {
    record: TalkRecord,
}

impl TalkInfo {
    pub fn new(record: TalkRecord) -> Self {
        Self { record }
    }

    pub fn code(&self) -> &str {
        &self.record.code
    }

    pub fn record(&self) -> &TalkRecord {
        &self.record
    }

    pub fn pill(&self) -> String {
        pill_text(Some(&self.record.code))
    }

    pub fn title(&self) -> &str {
        &self.record.description
    }

    pub fn university_line(&self) -> Option<String> {
        self.record
            .university
            .as_ref()
            .map(|name| format!("University: {}", name))
    }

    /// `Date/Time: <date> <time>`, omitting empty parts; `None` when both are empty
    pub fn schedule_line(&self) -> Option<String> {
        let parts: Vec<&str> = [self.record.date.as_str(), self.record.time.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(format!("Date/Time: {}", parts.join(" ")))
        }
    }
}

/// Fetch the talk for an already resolved code
pub async fn load_talk(api: &dyn AttendanceApi, code: &str) -> Result<TalkInfo, TalkError> {
    let record = api.fetch_talk(code).await.map_err(|err| match err {
        ApiError::Rejected { message } => {
            debug!("Talk {} rejected: {:?}", code, message);
            TalkError::NotFound {
                code: code.to_string(),
            }
        }
        other => TalkError::Unavailable(other),
    })?;

    if !record.active {
        return Err(TalkError::Inactive {
            code: code.to_string(),
        });
    }

    info!("Talk {} loaded: {}", code, record.description);
    Ok(TalkInfo::new(record))
}

/// Resolve and load in one step. A missing code never reaches the network.
pub async fn load(api: &dyn AttendanceApi, code: Option<&str>) -> Result<TalkInfo, TalkError> {
    match code {
        Some(code) => load_talk(api, code).await,
        None => Err(TalkError::MissingCode),
    }
}
