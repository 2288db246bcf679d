//! Attendee registration and QR artifact generation.

use crate::api::{AttendanceApi, RegistrationStatus};
use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::scanner::ScanPayload;
use crate::talk::{self, TalkInfo};
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File name of the generated QR artifact
pub const QR_FILE_NAME: &str = "qrcode.png";

/// Accepted semester values, `1º` through `12º`
pub fn semester_options() -> Vec<String> {
    (1..=12).map(|n| format!("{}º", n)).collect()
}

/// Attendee-entered fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub period: String,
    pub profile: String,
    pub semester: String,
    pub graduation_year: String,
}

impl RegistrationForm {
    /// Check the form and combine it with the talk's details
    pub fn validate(&self, talk: &TalkInfo) -> std::result::Result<RegistrationRequest, RegistrationError> {
        let required = [
            ("email", &self.email),
            ("name", &self.name),
            ("period", &self.period),
            ("profile", &self.profile),
            ("semester", &self.semester),
            ("graduation_year", &self.graduation_year),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(RegistrationError::MissingField { field });
        }

        let year = self.graduation_year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistrationError::InvalidGraduationYear {
                value: year.to_string(),
            });
        }

        let semester = self.semester.trim();
        if !semester_options().iter().any(|option| option == semester) {
            return Err(RegistrationError::InvalidSemester {
                value: semester.to_string(),
            });
        }

        let record = talk.record();
        Ok(RegistrationRequest {
            event_code: record.code.clone(),
            university: record.university.clone().unwrap_or_default(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            profile: self.profile.trim().to_string(),
            period: self.period.trim().to_string(),
            semester: semester.to_string(),
            graduation_year: year.to_string(),
            date: record.date.clone(),
            time: record.time.clone(),
        })
    }
}

/// Validated registration, one field per spreadsheet column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub event_code: String,
    pub university: String,
    pub name: String,
    pub email: String,
    pub profile: String,
    pub period: String,
    pub semester: String,
    pub graduation_year: String,
    pub date: String,
    pub time: String,
}

impl RegistrationRequest {
    /// Form body of `action=registrar`
    pub fn form_fields(&self) -> [(&'static str, &str); 11] {
        [
            ("action", "registrar"),
            ("CodigoPalestra", &self.event_code),
            ("Universidade", &self.university),
            ("Nome", &self.name),
            ("Email", &self.email),
            ("Perfil", &self.profile),
            ("Periodo", &self.period),
            ("Semestre", &self.semester),
            ("AnoFormatura", &self.graduation_year),
            ("Data", &self.date),
            ("Horario", &self.time),
        ]
    }

    /// What the attendee's QR code carries
    pub fn qr_payload(&self) -> ScanPayload {
        ScanPayload::new(&self.email, &self.event_code)
    }
}

/// Render `text` as an error-correction level M QR image at least `size` pixels wide
pub fn render_qr(text: &str, size: u32) -> std::result::Result<GrayImage, RegistrationError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M).map_err(|e| {
        RegistrationError::QrEncoding {
            details: e.to_string(),
        }
    })?;
    Ok(code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build())
}

/// Write the QR artifact for `payload` into `dir`
pub fn write_qr(payload: &ScanPayload, size: u32, dir: &Path) -> Result<PathBuf> {
    let image = render_qr(&payload.to_string(), size)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(QR_FILE_NAME);
    image.save(&path)?;
    info!("QR code for {} written to {}", payload, path.display());
    Ok(path)
}

/// Result of a completed registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub status: RegistrationStatus,
    pub payload: ScanPayload,
    pub qr_path: PathBuf,
}

impl RegistrationOutcome {
    pub fn message(&self) -> String {
        let status = match self.status {
            RegistrationStatus::New => "(new)",
            RegistrationStatus::Existing => "(already registered)",
        };
        format!("QR generated {}: {}", status, self.payload)
    }
}

/// Registration page: talk gate, submission and QR output
pub struct Registrar {
    api: Arc<dyn AttendanceApi>,
    config: RegistrationConfig,
}

impl Registrar {
    pub fn new(api: Arc<dyn AttendanceApi>, config: RegistrationConfig) -> Self {
        Self { api, config }
    }

    /// Load the talk; a missing or inactive talk blocks registration
    pub async fn open(&self, code: Option<&str>) -> std::result::Result<TalkInfo, RegistrationError> {
        talk::load(self.api.as_ref(), code).await.map_err(|err| {
            warn!("Registration blocked: {}", err);
            RegistrationError::Blocked(err)
        })
    }

    /// Validate, submit and write the QR artifact
    pub async fn submit(&self, talk: &TalkInfo, form: &RegistrationForm) -> Result<RegistrationOutcome> {
        let request = form.validate(talk)?;
        let status = self.api.register_attendee(&request).await?;
        let payload = request.qr_payload();
        let qr_path = write_qr(
            &payload,
            self.config.qr_size,
            Path::new(&self.config.output_dir),
        )?;

        Ok(RegistrationOutcome {
            status,
            payload,
            qr_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{QrDecoder, RqrrDecoder};
    use crate::error::{ApiError, KioskError, TalkError};
    use crate::frame::{FrameData, LumaBuffer};
    use crate::testing::{talk_record, FakeApi};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "Alice".to_string(),
            email: " alice@x.com ".to_string(),
            period: "Noturno".to_string(),
            profile: "Aluno".to_string(),
            semester: "3º".to_string(),
            graduation_year: "2027".to_string(),
        }
    }

    fn talk() -> TalkInfo {
        TalkInfo::new(talk_record("TALK1"))
    }

    fn registrar(api: Arc<FakeApi>, dir: &TempDir) -> Registrar {
        Registrar::new(
            api,
            RegistrationConfig {
                qr_size: 250,
                output_dir: dir.path().to_string_lossy().into_owned(),
            },
        )
    }

    #[test]
    fn test_semester_options() {
        let options = semester_options();
        assert_eq!(options.len(), 12);
        assert_eq!(options[0], "1º");
        assert_eq!(options[11], "12º");
    }

    #[test]
    fn test_validation_errors() {
        let mut missing = form();
        missing.period.clear();
        assert_eq!(
            missing.validate(&talk()),
            Err(RegistrationError::MissingField { field: "period" })
        );

        let mut year = form();
        year.graduation_year = "27".to_string();
        assert_eq!(
            year.validate(&talk()),
            Err(RegistrationError::InvalidGraduationYear {
                value: "27".to_string()
            })
        );

        let mut semester = form();
        semester.semester = "13º".to_string();
        assert!(matches!(
            semester.validate(&talk()),
            Err(RegistrationError::InvalidSemester { .. })
        ));
    }

    #[test]
    fn test_request_carries_talk_columns() {
        let request = form().validate(&talk()).unwrap();
        let fields = request.form_fields();

        assert_eq!(fields[0], ("action", "registrar"));
        assert!(fields.contains(&("CodigoPalestra", "TALK1")));
        assert!(fields.contains(&("Universidade", "Unicamp")));
        assert!(fields.contains(&("Email", "alice@x.com")));
        assert!(fields.contains(&("Data", "10/11/2026")));
        assert!(fields.contains(&("Horario", "19:30")));
        assert_eq!(request.qr_payload().to_string(), "alice@x.com|TALK1");
    }

    #[tokio::test]
    async fn test_submit_writes_scannable_qr() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::default());
        api.push_registration(Ok(RegistrationStatus::Existing));

        let outcome = registrar(api.clone(), &dir)
            .submit(&talk(), &form())
            .await
            .unwrap();

        assert_eq!(outcome.qr_path, dir.path().join(QR_FILE_NAME));
        assert_eq!(
            outcome.message(),
            "QR generated (already registered): alice@x.com|TALK1"
        );
        assert_eq!(api.register_calls.lock().len(), 1);

        let image = image::open(&outcome.qr_path).unwrap().to_luma8();
        assert!(image.width() >= 250);
        let frame = FrameData::new(
            1,
            SystemTime::now(),
            image.as_raw().clone(),
            image.width(),
            image.height(),
        );
        let mut buffer = LumaBuffer::new();
        buffer.fill_from(&frame).unwrap();
        assert_eq!(
            RqrrDecoder::new().decode(&buffer).as_deref(),
            Some("alice@x.com|TALK1")
        );
    }

    #[tokio::test]
    async fn test_rejected_registration_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(FakeApi::default());
        api.push_registration(Err(ApiError::Rejected {
            message: Some("Email inválido".to_string()),
        }));

        let err = registrar(api, &dir)
            .submit(&talk(), &form())
            .await
            .unwrap_err();

        assert!(matches!(err, KioskError::Api(ApiError::Rejected { .. })));
        assert!(!dir.path().join(QR_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_inactive_talk_blocks_registration() {
        let dir = TempDir::new().unwrap();
        let mut record = talk_record("TALK1");
        record.active = false;
        let api = FakeApi::with_talk(record);

        let err = registrar(api.clone(), &dir)
            .open(Some("TALK1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Blocked(TalkError::Inactive { .. })
        ));

        let err = registrar(api, &dir).open(None).await.unwrap_err();
        assert_eq!(err, RegistrationError::Blocked(TalkError::MissingCode));
    }
}
