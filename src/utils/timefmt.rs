use chrono::{DateTime, Utc};

/// 开奖倒计时的人类可读形式（"in 2d 5h" 之类）。
/// 已过期返回 "any moment now"，开奖任务马上会处理它。
pub fn human_time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (target - now).num_seconds();
    if secs <= 0 {
        return "any moment now".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        if hours > 0 {
            format!("in {days}d {hours}h")
        } else {
            format!("in {days}d")
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!("in {hours}h {minutes}m")
        } else {
            format!("in {hours}h")
        }
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        "in less than a minute".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_days_and_hours() {
        let now = at(2026, 8, 3, 10, 0);
        assert_eq!(human_time_until(at(2026, 8, 9, 20, 0), now), "in 6d 10h");
        assert_eq!(human_time_until(at(2026, 8, 5, 10, 0), now), "in 2d");
    }

    #[test]
    fn test_hours_and_minutes() {
        let now = at(2026, 8, 3, 10, 0);
        assert_eq!(human_time_until(at(2026, 8, 3, 15, 30), now), "in 5h 30m");
        assert_eq!(human_time_until(at(2026, 8, 3, 12, 0), now), "in 2h");
        assert_eq!(human_time_until(at(2026, 8, 3, 10, 45), now), "in 45m");
    }

    #[test]
    fn test_under_a_minute_and_past_due() {
        let now = at(2026, 8, 3, 10, 0);
        let soon = now + chrono::Duration::seconds(30);
        assert_eq!(human_time_until(soon, now), "in less than a minute");
        assert_eq!(human_time_until(now, now), "any moment now");
        let past = now - chrono::Duration::hours(1);
        assert_eq!(human_time_until(past, now), "any moment now");
    }
}
