use chrono::Utc;

/// Current wall-clock time in seconds since the Unix epoch, millisecond precision.
pub fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
