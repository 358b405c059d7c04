use chrono::NaiveDate;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Today's calendar date in local time (bills and payments carry no time component)
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Generate a Snowflake-style i64 for use as record ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_id_is_positive_and_js_safe() {
        const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;
        for _ in 0..100 {
            let id = snowflake_id();
            assert!(id > 0);
            assert!(id <= MAX_SAFE_INTEGER);
        }
    }

    #[test]
    fn test_snowflake_ids_are_time_ordered() {
        let a = snowflake_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = snowflake_id();
        assert!(b >> 12 > a >> 12);
    }
}
