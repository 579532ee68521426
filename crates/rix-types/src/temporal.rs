/// Milliseconds since the UNIX epoch, the unit of `BaseReading::created`.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_produces_reasonable_timestamp() {
        // Should be after 2020-01-01 (1577836800000 ms)
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn now_does_not_go_backwards() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
