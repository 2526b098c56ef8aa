//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, clamped at zero
pub fn elapsed_ms(start: DateTime<Utc>) -> i64 {
    (now() - start).num_milliseconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01, before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[tokio::test]
    async fn test_elapsed_ms_counts_up() {
        let start = now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(elapsed_ms(start) >= 20);
    }

    #[test]
    fn test_elapsed_ms_future_start_clamps_to_zero() {
        let start = now() + chrono::Duration::seconds(60);
        assert_eq!(elapsed_ms(start), 0);
    }
}
