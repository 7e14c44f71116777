// src/main.rs

use std::path::{Path, PathBuf};

use ahgora_core::{AhgoraConfig, AttendanceService, PunchRecord, Timesheet};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ahgora", about = "Reads punches from the Ahgora attendance portal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the configured credentials are accepted.
    Login,
    /// List the punches of a pay period (the current one by default).
    Punches {
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        /// Also write the punches to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List the punches of one calendar day.
    Day {
        #[arg(long)]
        day: i32,
        #[arg(long)]
        month: i32,
        #[arg(long)]
        year: i32,
    },
    /// Show name, role and department (REST backend only).
    Profile,
}

#[derive(Debug, Serialize)]
struct CsvPunch {
    date: String,
    time: String,
}

impl From<&PunchRecord> for CsvPunch {
    fn from(punch: &PunchRecord) -> Self {
        Self {
            date: punch.date().format("%Y-%m-%d").to_string(),
            time: punch.time().format("%H:%M").to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AhgoraConfig::from_env().context("reading AHGORA_* configuration")?;
    info!(backend = %config.backend, company = %config.company, "Loaded configuration");

    let service = AttendanceService::from_config(&config)?;
    if !service.login().await? {
        bail!("login rejected for {} at {}", config.username, config.company);
    }

    match cli.command {
        Command::Login => {
            println!("✅ Logged in as {} ({})", config.username, config.backend);
        }
        Command::Punches { month, year, csv } => {
            let timesheet = service.get_timesheet(month, year).await?;
            print_timesheet(&timesheet);
            if let Some(path) = csv {
                write_csv(&path, &timesheet.punches)?;
                println!("\n💾 Wrote {} punches to {}", timesheet.punches.len(), path.display());
            }
        }
        Command::Day { day, month, year } => {
            let punches = service.get_punches_for_day(day, month, year).await?;
            if punches.is_empty() {
                println!("No punches on that day");
            }
            for punch in &punches {
                println!("{}", punch.at.format("%Y-%m-%d %H:%M"));
            }
        }
        Command::Profile => {
            let profile = service.get_employee_profile().await?;
            let show = |value: Option<String>| value.unwrap_or_else(|| "not available".to_string());
            println!("Name:       {}", show(profile.name));
            println!("Role:       {}", show(profile.role));
            println!("Department: {}", show(profile.department));
        }
    }

    Ok(())
}

fn print_timesheet(timesheet: &Timesheet) {
    let mut current = None;
    for punch in &timesheet.punches {
        if current != Some(punch.date()) {
            current = Some(punch.date());
            print!("\n{}:", punch.date());
        }
        print!(" {}", punch.time().format("%H:%M"));
    }
    println!();

    if !timesheet.balances.is_empty() {
        println!("\nBalances (shortage / overtime):");
        for day in &timesheet.balances {
            println!("{}  {} / {}", day.date, day.balance.shortage, day.balance.overtime);
        }
    }
}

fn write_csv(path: &Path, punches: &[PunchRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for punch in punches {
        writer.serialize(CsvPunch::from(punch))?;
    }
    writer.flush()?;
    Ok(())
}
