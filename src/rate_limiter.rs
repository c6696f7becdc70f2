use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config;
use crate::errors::AppError;

/// Entry untuk rate limiting
#[derive(Clone, Debug)]
struct RateLimitEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Rate limiter dengan sliding window, di-key per identifier (mis. username)
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    /// Max requests per window
    max_requests: u32,
    /// Window duration in seconds
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_seconds,
        }
    }

    /// Check if action is rate limited for the given key
    /// Returns Ok(()) if allowed, Err if rate limited
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Internal("Failed to acquire rate limiter lock".into()))?;

        let now = Utc::now();
        let window_duration = Duration::seconds(self.window_seconds);

        let entry = entries.entry(key.to_string()).or_insert_with(|| RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // Check if window has expired
        if now >= entry.window_start + window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        if entry.count > self.max_requests {
            let retry_after = (entry.window_start + window_duration - now).num_seconds();
            return Err(AppError::Auth(format!(
                "Terlalu banyak percobaan, coba lagi dalam {} detik",
                retry_after.max(0)
            )));
        }

        Ok(())
    }

    /// Reset counter untuk key (dipanggil setelah login sukses).
    pub fn reset(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

lazy_static::lazy_static! {
    /// Rate limit percobaan login, dibaca dari konfigurasi security
    /// (default: 5 percobaan per 15 menit).
    pub static ref LOGIN_LIMIT: RateLimiter = {
        let security = &config::get_config().security;
        RateLimiter::new(
            security.max_login_attempts,
            (security.lockout_duration_mins * 60) as i64,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_err());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_err());
        assert!(limiter.check("sari").is_ok());
    }

    #[test]
    fn test_reset_clears_counter() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_ok());
        assert!(limiter.check("budi").is_err());

        limiter.reset("budi");
        assert!(limiter.check("budi").is_ok());
    }
}
