use async_trait::async_trait;
use brewhouse::{ManualClock, TemperatureSource, UpstreamError};
use chrono::{DateTime, FixedOffset, TimeZone};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 09:30 local time (+08:00) on the given day of 2025.
pub fn manila(month: u32, day: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .expect("valid offset")
        .with_ymd_and_hms(2025, month, day, 9, 30, 0)
        .single()
        .expect("valid date")
}

pub fn clock_on(month: u32, day: u32) -> ManualClock {
    ManualClock::new(manila(month, day))
}

/// Temperature source that returns a settable reading and counts calls.
#[derive(Debug)]
pub struct CountingSource {
    reading: Mutex<Result<f64, UpstreamError>>,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn reporting(celsius: f64) -> Arc<Self> {
        Arc::new(Self { reading: Mutex::new(Ok(celsius)), calls: AtomicUsize::new(0) })
    }

    pub fn set(&self, reading: Result<f64, UpstreamError>) {
        *self.reading.lock().unwrap() = reading;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemperatureSource for CountingSource {
    async fn temperature(&self) -> Result<f64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reading.lock().unwrap().clone()
    }
}
