use super::types::{
    ConfirmationStatus, RegistrationStatus, StatusResponse, TalkRecord, TalkResponse,
};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::registration::RegistrationRequest;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

/// Remote attendance service
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Look up a talk by code
    async fn fetch_talk(&self, code: &str) -> Result<TalkRecord, ApiError>;

    /// Record that `email` attended `event_code`
    async fn confirm_attendance(
        &self,
        event_code: &str,
        email: &str,
    ) -> Result<ConfirmationStatus, ApiError>;

    /// Register an attendee for a talk
    async fn register_attendee(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationStatus, ApiError>;
}

/// Form body of an attendance confirmation
pub fn confirmation_form<'a>(event_code: &'a str, email: &'a str) -> [(&'static str, &'a str); 3] {
    [
        ("action", "presenca"),
        ("codigoPalestra", event_code),
        ("email", email),
    ]
}

/// Client for the spreadsheet-script endpoint
pub struct HttpAttendanceApi {
    client: Client,
    base_url: Url,
}

impl HttpAttendanceApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidResponse {
            details: format!("invalid base url {:?}: {}", config.base_url, e),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET` URL for a talk lookup
    pub fn talk_url(&self, code: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("codigo", code);
        url
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Attendance API returned {}: {}", status, body);
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceApi {
    async fn fetch_talk(&self, code: &str) -> Result<TalkRecord, ApiError> {
        let url = self.talk_url(code);
        info!("Fetching talk {}", code);

        let response = self.client.get(url).send().await?;
        let body: TalkResponse = Self::read_json(response).await?;
        let record = body.into_record(code)?;
        debug!("Talk {} loaded: {:?}", code, record);
        Ok(record)
    }

    async fn confirm_attendance(
        &self,
        event_code: &str,
        email: &str,
    ) -> Result<ConfirmationStatus, ApiError> {
        info!("Confirming attendance of {} for {}", email, event_code);

        let response = self
            .client
            .post(self.base_url.clone())
            .form(&confirmation_form(event_code, email))
            .send()
            .await?;
        let body: StatusResponse = Self::read_json(response).await?;
        body.into_confirmation()
    }

    async fn register_attendee(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationStatus, ApiError> {
        info!(
            "Registering {} for {}",
            request.email, request.event_code
        );

        let response = self
            .client
            .post(self.base_url.clone())
            .form(&request.form_fields())
            .send()
            .await?;
        let body: StatusResponse = Self::read_json(response).await?;
        body.into_registration()
    }
}
