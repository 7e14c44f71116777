// src/clock.rs

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

/// Source of "today" for period defaults.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to a date until moved with [`FixedClock::set_today`].
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Arc::new(Mutex::new(today)),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        if let Ok(mut guard) = self.today.lock() {
            *guard = today;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
