// src/lib.rs

//! Client for the Ahgora time-and-attendance portal.
//!
//! Logs an employee in, fetches the punches page (classic HTML backend) or the `getApuracao`
//! payload (REST backend) and turns it into timestamps for a pay period. Pay periods roll over
//! on the 20th, see [`period`].

pub mod assembler;
pub mod auth;
pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod parser;
pub mod period;
pub mod service;

#[cfg(test)]
mod testing;

pub use assembler::{DailyBalance, PunchRecord, Timesheet, DEFAULT_DATETIME_FORMAT};
pub use auth::{Credentials, SessionState};
pub use backend::{Backend, Endpoints, AHGORA_BASE_URL};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AhgoraConfig;
pub use error::{AhgoraError, Result};
pub use http::{HttpClient, HttpClientConfig, HttpResponse, ReqwestHttpClient};
pub use logging::{LogLevel, Logger, NoopLogger, TracingLogger};
pub use parser::{AttendanceRow, DayBalance, EmployeeProfile};
pub use period::PayPeriod;
pub use service::AttendanceService;
