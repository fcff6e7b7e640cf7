use chrono::Utc;

/// Current time as Unix seconds
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}
