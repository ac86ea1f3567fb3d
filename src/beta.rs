// src/beta.rs
//! Beta gate: after a fixed cutover the chat endpoint and pages refuse service.

use chrono::{DateTime, Datelike, Local, TimeZone};

const MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

/// "19 de octubre de 2026 a las 14:30".
pub fn format_spanish_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let month = MONTHS[at.month0() as usize];
    format!(
        "{} de {} de {} a las {}",
        at.day(),
        month,
        at.year(),
        at.format("%H:%M")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetaStatus {
    /// No cutover configured.
    Open,
    Active {
        minutes_remaining: i64,
        expires_at: DateTime<Local>,
    },
    Expired {
        expires_at: DateTime<Local>,
    },
}

impl BetaStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BetaGate {
    expires_at: Option<DateTime<Local>>,
}

impl BetaGate {
    pub fn new(expires_at: Option<DateTime<Local>>) -> Self {
        Self { expires_at }
    }

    pub fn open() -> Self {
        Self::default()
    }

    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        self.expires_at
    }

    /// Active up to and including the cutover instant.
    pub fn status_at(&self, now: DateTime<Local>) -> BetaStatus {
        match self.expires_at {
            None => BetaStatus::Open,
            Some(expires_at) if now <= expires_at => BetaStatus::Active {
                minutes_remaining: (expires_at - now).num_minutes(),
                expires_at,
            },
            Some(expires_at) => BetaStatus::Expired { expires_at },
        }
    }

    pub fn status(&self) -> BetaStatus {
        self.status_at(Local::now())
    }

    /// Explanation returned with a 403.
    pub fn expired_message(expires_at: &DateTime<Local>) -> String {
        format!(
            "Esta versión beta expiró el {}. Contacta al administrador para obtener la versión completa.",
            format_spanish_date(expires_at)
        )
    }
}
