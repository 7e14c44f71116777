// src/auth.rs

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::backend::{Backend, Endpoints};
use crate::error::Result;
use crate::http::{HttpClient, HttpResponse};
use crate::logging::Logger;
use crate::parser::decode_entities;

/// Text the landing page shows when the organization has external access turned off.
pub const ACCESS_DISABLED_MARKER: &str = "Sua Empresa não liberou o acesso a essa ferramenta";

const LOGIN_SUCCESS: &str = "success";

/// Login data of one employee. Fixed for the lifetime of a service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub company: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        company: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company", &self.company)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }

    fn from_flag(authenticated: bool) -> Self {
        if authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }
}

/// Reduces text to lowercase ASCII letters and digits so the marker matches whether the page
/// was served as UTF-8, double-encoded Latin-1 or with HTML entities.
pub fn normalize_marker_text(text: &str) -> String {
    decode_entities(text)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn access_disabled(landing_body: &str) -> bool {
    normalize_marker_text(landing_body).contains(&normalize_marker_text(ACCESS_DISABLED_MARKER))
}

/// Classic predicate: status 200 and a JSON body whose `r` is `"success"`.
/// A body that is not JSON counts as a rejected login and is only logged.
pub fn classic_login_succeeded(response: &HttpResponse, logger: &dyn Logger) -> bool {
    if !response.is_ok() {
        logger.debug(
            "Login request returned a non-200 status",
            &[("status", response.status.to_string())],
        );
        return false;
    }

    match response.json() {
        Ok(json) => json.get("r").and_then(Value::as_str) == Some(LOGIN_SUCCESS),
        Err(e) => {
            logger.error("checkLoginStatus: login response is not JSON", &[("exception", e.to_string())]);
            false
        }
    }
}

/// REST predicate: the decoded `empresa.empresa` equals the submitted organization id.
pub fn rest_login_succeeded(payload: &Value, company: &str) -> bool {
    match payload.pointer("/empresa/empresa") {
        Some(Value::String(empresa)) => empresa == company,
        Some(Value::Number(empresa)) => empresa.to_string() == company,
        _ => false,
    }
}

/// Runs the login handshake for one backend and reports the resulting state.
pub struct SessionAuthenticator<'a> {
    http: &'a dyn HttpClient,
    endpoints: &'a Endpoints,
    logger: &'a dyn Logger,
}

impl<'a> SessionAuthenticator<'a> {
    pub fn new(http: &'a dyn HttpClient, endpoints: &'a Endpoints, logger: &'a dyn Logger) -> Self {
        Self {
            http,
            endpoints,
            logger,
        }
    }

    /// Always starts from `Unauthenticated`. Transport failures are returned as errors; every
    /// portal answer, including a garbled one, ends in a state.
    pub async fn login(
        &self,
        backend: Backend,
        credentials: &Credentials,
        today: NaiveDate,
    ) -> Result<SessionState> {
        self.logger.debug(
            "Started login process",
            &[
                ("backend", backend.to_string()),
                ("company_id", credentials.company.clone()),
                ("username", credentials.username.clone()),
            ],
        );

        let authenticated = match backend {
            Backend::Classic => self.classic_login(credentials).await?,
            Backend::Rest => self.rest_login(credentials, today).await?,
        };

        let state = SessionState::from_flag(authenticated);
        self.logger
            .debug("setLoggedIn", &[("logged_in", authenticated.to_string())]);
        Ok(state)
    }

    async fn classic_login(&self, credentials: &Credentials) -> Result<bool> {
        let company_url = self.endpoints.company(&credentials.company);
        self.logger.debug("CompanyURL", &[("company_url", company_url.clone())]);

        let landing = self.http.get(&company_url).await?;
        if access_disabled(&landing.body) {
            self.logger.info("Company hasn't external access enabled", &[]);
            return Ok(false);
        }
        self.logger.debug("Company has external access enabled", &[]);

        let login_url = self.endpoints.login();
        self.logger.debug("loginUrl", &[("login_url", login_url.clone())]);
        let response = self
            .http
            .post(
                &login_url,
                &[
                    ("empresa", credentials.company.as_str()),
                    ("matricula", credentials.username.as_str()),
                    ("senha", credentials.password.as_str()),
                ],
            )
            .await?;

        Ok(classic_login_succeeded(&response, self.logger))
    }

    async fn rest_login(&self, credentials: &Credentials, today: NaiveDate) -> Result<bool> {
        let month = format!("{:02}", today.month());
        let year = today.year().to_string();
        let response = self
            .http
            .post(
                &self.endpoints.apuracao(),
                &[
                    ("company", credentials.company.as_str()),
                    ("matricula", credentials.username.as_str()),
                    ("senha", credentials.password.as_str()),
                    ("mes", month.as_str()),
                    ("ano", year.as_str()),
                ],
            )
            .await?;

        match response.json() {
            Ok(payload) => Ok(rest_login_succeeded(&payload, &credentials.company)),
            Err(e) => {
                self.logger.error(
                    &e.to_string(),
                    &[
                        ("company", credentials.company.clone()),
                        ("matricula", credentials.username.clone()),
                        ("mes", month),
                        ("ano", year),
                    ],
                );
                Ok(false)
            }
        }
    }
}
