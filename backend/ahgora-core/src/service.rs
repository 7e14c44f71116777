// src/service.rs

use std::sync::Arc;

use chrono::Datelike;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::assembler::{assemble_timesheet, PunchRecord, Timesheet, DEFAULT_DATETIME_FORMAT};
use crate::auth::{Credentials, SessionAuthenticator, SessionState};
use crate::backend::{Backend, Endpoints};
use crate::clock::{Clock, SystemClock};
use crate::config::AhgoraConfig;
use crate::error::{AhgoraError, Result};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::logging::{Logger, TracingLogger};
use crate::parser::{
    check_backend_error, extract_html_rows, extract_json_rows, extract_profile, AttendanceRow,
    EmployeeProfile,
};
use crate::period::{self, PayPeriod};

/// Public entry point: logs an employee into the portal and reads their punches.
///
/// Every data operation requires a successful [`AttendanceService::login`] first and fails with
/// `NotAuthenticated` otherwise, before any request goes out.
pub struct AttendanceService {
    backend: Backend,
    credentials: Credentials,
    endpoints: Endpoints,
    datetime_format: String,
    http_client: Arc<dyn HttpClient>,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
    session: Mutex<SessionState>,
    // Filled by the first profile lookup, cleared by every login.
    profile: Mutex<Option<EmployeeProfile>>,
}

impl AttendanceService {
    pub fn new(backend: Backend, credentials: Credentials, http_client: Arc<dyn HttpClient>) -> Self {
        let service = Self {
            backend,
            credentials,
            endpoints: Endpoints::default(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            http_client,
            logger: Arc::new(TracingLogger),
            clock: Arc::new(SystemClock),
            session: Mutex::new(SessionState::Unauthenticated),
            profile: Mutex::new(None),
        };
        service.logger.debug(
            "Api instance created",
            &[
                ("backend", backend.to_string()),
                ("company_id", service.credentials.company.clone()),
                ("username", service.credentials.username.clone()),
            ],
        );
        service
    }

    /// Builds a service with a `reqwest` transport from loaded configuration.
    pub fn from_config(config: &AhgoraConfig) -> Result<Self> {
        let http_client = ReqwestHttpClient::new(config.http_config())?;
        let service = Self::new(config.backend, config.credentials(), Arc::new(http_client))
            .with_base_url(&config.base_url)?
            .with_datetime_format(&config.datetime_format);
        Ok(service)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.endpoints = Endpoints::new(base_url)?;
        Ok(self)
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_datetime_format(mut self, datetime_format: &str) -> Self {
        self.set_datetime_format(datetime_format);
        self
    }

    /// Changes the chrono pattern used to read `"<date label> <HH:MM>"` into timestamps.
    pub fn set_datetime_format(&mut self, datetime_format: &str) -> &mut Self {
        self.datetime_format = datetime_format.to_string();
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    /// Runs the login handshake and returns whether the session is now authenticated.
    /// A rejected login is `Ok(false)`; only transport failures are errors.
    pub async fn login(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        *session = SessionState::Unauthenticated;
        self.profile.lock().await.take();

        let authenticator =
            SessionAuthenticator::new(self.http_client.as_ref(), &self.endpoints, self.logger.as_ref());
        let state = authenticator
            .login(self.backend, &self.credentials, self.clock.today())
            .await?;
        *session = state;

        Ok(state.is_authenticated())
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.session.lock().await.is_authenticated() {
            Ok(())
        } else {
            Err(AhgoraError::NotAuthenticated)
        }
    }

    /// Punches and daily balances of a period. `None` for both picks the period of today.
    pub async fn get_timesheet(&self, month: Option<u32>, year: Option<i32>) -> Result<Timesheet> {
        self.ensure_authenticated().await?;
        let period = period::resolve(month, year, self.clock.today())?;
        self.fetch_timesheet(period).await
    }

    pub async fn get_punches_for_period(
        &self,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<Vec<PunchRecord>> {
        Ok(self.get_timesheet(month, year).await?.punches)
    }

    /// Punches of one calendar day. Out-of-range input is normalized first, so day 0 of March
    /// is the last day of February.
    pub async fn get_punches_for_day(&self, day: i32, month: i32, year: i32) -> Result<Vec<PunchRecord>> {
        self.ensure_authenticated().await?;
        let date = period::normalize_day(day, month, year)?;
        let pay_period = period::period_for_date(date);
        self.logger.debug(
            "getPunchesFromDay",
            &[("date", date.to_string()), ("period", pay_period.to_string())],
        );

        let timesheet = self.fetch_timesheet(pay_period).await?;
        Ok(period::filter_day(timesheet.punches, date.day()))
    }

    /// Name, role and department. The classic backend exposes none of them.
    pub async fn get_employee_profile(&self) -> Result<EmployeeProfile> {
        self.ensure_authenticated().await?;
        match self.backend {
            Backend::Classic => Ok(EmployeeProfile::not_available()),
            Backend::Rest => {
                let mut cached = self.profile.lock().await;
                if let Some(profile) = cached.as_ref() {
                    return Ok(profile.clone());
                }
                let today = self.clock.today();
                let payload = self
                    .fetch_apuracao(PayPeriod::new(today.month(), today.year())?)
                    .await?;
                let profile = extract_profile(&payload)?;
                *cached = Some(profile.clone());
                Ok(profile)
            }
        }
    }

    pub async fn get_employee_name(&self) -> Result<Option<String>> {
        Ok(self.get_employee_profile().await?.name)
    }

    pub async fn get_employee_role(&self) -> Result<Option<String>> {
        Ok(self.get_employee_profile().await?.role)
    }

    pub async fn get_department(&self) -> Result<Option<String>> {
        Ok(self.get_employee_profile().await?.department)
    }

    async fn fetch_timesheet(&self, pay_period: PayPeriod) -> Result<Timesheet> {
        let rows = match self.backend {
            Backend::Classic => self.fetch_classic_rows(pay_period).await?,
            Backend::Rest => extract_json_rows(&self.fetch_apuracao(pay_period).await?)?,
        };

        let timesheet = assemble_timesheet(&rows, &self.datetime_format)?;
        self.logger.info(
            "Punches fetched",
            &[
                ("period", pay_period.to_string()),
                ("days", rows.len().to_string()),
                ("punches", timesheet.punches.len().to_string()),
            ],
        );
        Ok(timesheet)
    }

    async fn fetch_classic_rows(&self, pay_period: PayPeriod) -> Result<Vec<AttendanceRow>> {
        let punches_url = self.endpoints.punches(pay_period);
        self.logger.debug("punchesUrl", &[("punches_url", punches_url.clone())]);

        let response = self.http_client.get(&punches_url).await?;
        if !response.is_ok() {
            self.logger.error(
                "Punches page returned an unexpected status",
                &[("status", response.status.to_string())],
            );
            return Err(AhgoraError::UnexpectedStatus(response.status));
        }
        extract_html_rows(&response.body)
    }

    async fn fetch_apuracao(&self, pay_period: PayPeriod) -> Result<Value> {
        let month = pay_period.month_padded();
        let year = pay_period.year.to_string();
        let response = self
            .http_client
            .post(
                &self.endpoints.apuracao(),
                &[
                    ("company", self.credentials.company.as_str()),
                    ("matricula", self.credentials.username.as_str()),
                    ("senha", self.credentials.password.as_str()),
                    ("mes", month.as_str()),
                    ("ano", year.as_str()),
                ],
            )
            .await?;

        let payload = response.json().and_then(|payload| {
            check_backend_error(&payload)?;
            Ok(payload)
        });
        if let Err(e) = &payload {
            self.logger.error(
                &e.to_string(),
                &[
                    ("company", self.credentials.company.clone()),
                    ("matricula", self.credentials.username.clone()),
                    ("mes", month),
                    ("ano", year),
                ],
            );
        }
        payload
    }
}
