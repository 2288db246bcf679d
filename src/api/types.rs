//! Wire shapes of the spreadsheet-script endpoint. Field names are fixed by the remote side.

use crate::error::ApiError;
use serde::Deserialize;
use serde_json::Value;

/// Talk metadata as used by the kiosk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkRecord {
    pub code: String,
    pub description: String,
    pub university: Option<String>,
    pub active: bool,
    pub date: String,
    pub time: String,
}

/// Outcome of a successful attendance confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// `status: "confirmada"`
    Confirmed,
    /// `status: "ja_confirmada"`
    AlreadyConfirmed,
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// `status: "novo"`
    New,
    /// `status: "existente"`
    Existing,
}

/// `GET ?codigo=<code>`
#[derive(Debug, Deserialize)]
pub struct TalkResponse {
    pub ok: bool,
    #[serde(default)]
    pub palestra: Option<TalkPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Spreadsheet row of a talk. Column names vary in case across sheets.
#[derive(Debug, Default, Deserialize)]
pub struct TalkPayload {
    #[serde(default)]
    pub descricao: Option<Value>,
    #[serde(rename = "DESCRICAO", default)]
    pub descricao_upper: Option<Value>,
    #[serde(rename = "CodigoPalestra", default)]
    pub codigo_palestra: Option<Value>,
    #[serde(default)]
    pub ativo: Option<Value>,
    #[serde(rename = "ATIVO", default)]
    pub ativo_upper: Option<Value>,
    #[serde(rename = "Data", default)]
    pub data: Option<Value>,
    #[serde(rename = "Horario", default)]
    pub horario: Option<Value>,
    #[serde(rename = "Universidade", default)]
    pub universidade: Option<Value>,
}

/// Reply to `action=presenca` and `action=registrar`
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TalkResponse {
    pub fn into_record(self, code: &str) -> Result<TalkRecord, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                message: self.error,
            });
        }
        let payload = self.palestra.ok_or_else(|| ApiError::InvalidResponse {
            details: "response has no palestra".to_string(),
        })?;
        Ok(payload.into_record(code))
    }
}

impl TalkPayload {
    pub fn into_record(self, code: &str) -> TalkRecord {
        let description = [&self.descricao, &self.descricao_upper, &self.codigo_palestra]
            .into_iter()
            .filter_map(|value| non_empty_text(value.as_ref()))
            .next()
            .unwrap_or_else(|| "Talk".to_string());

        TalkRecord {
            code: code.to_string(),
            description,
            university: non_empty_text(self.universidade.as_ref()),
            active: self.is_active(),
            date: non_empty_text(self.data.as_ref()).unwrap_or_default(),
            time: non_empty_text(self.horario.as_ref()).unwrap_or_default(),
        }
    }

    /// Boolean `ativo` wins; otherwise `ATIVO` compared as text; absent means active
    fn is_active(&self) -> bool {
        match (&self.ativo, &self.ativo_upper) {
            (Some(Value::Bool(active)), _) => *active,
            (_, Some(Value::Null)) | (_, None) => true,
            (_, Some(value)) => scalar_text(value).eq_ignore_ascii_case("true"),
        }
    }
}

impl StatusResponse {
    pub fn into_confirmation(self) -> Result<ConfirmationStatus, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                message: self.error,
            });
        }
        Ok(match self.status.as_deref() {
            Some("ja_confirmada") => ConfirmationStatus::AlreadyConfirmed,
            _ => ConfirmationStatus::Confirmed,
        })
    }

    pub fn into_registration(self) -> Result<RegistrationStatus, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                message: self.error,
            });
        }
        Ok(match self.status.as_deref() {
            Some("existente") => RegistrationStatus::Existing,
            _ => RegistrationStatus::New,
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    value.map(scalar_text).filter(|text| !text.is_empty())
}
