/// Utility functions
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.parse::<f64>().ok();
    }
    None
}

/// Pick the first numeric value found under any of the keys
pub fn f_pick(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| v.get(*k).and_then(num))
}

/// Pick string value from JSON by trying multiple keys
pub fn s_pick(v: &Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(x) = v.get(*k) {
            if let Some(s) = x.as_str() {
                if !s.trim().is_empty() {
                    return Some(s.trim().to_string());
                }
            } else if x.is_number() {
                return Some(x.to_string());
            }
        }
    }
    None
}

/// Parse an upstream timestamp string (RFC 3339 or "YYYY-MM-DD HH:MM:SS" UTC)
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    None
}

/// Convert Unix seconds into a timestamp
pub fn from_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(secs.saturating_mul(1000)).single()
}

/// Pick timestamp value from JSON by trying multiple keys.
/// Strings are parsed as dates, integers are Unix seconds.
pub fn t_pick(v: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    for k in keys {
        if let Some(x) = v.get(*k) {
            if let Some(s) = x.as_str() {
                if let Some(dt) = parse_time(s) {
                    return Some(dt);
                }
            } else if let Some(n) = x.as_i64() {
                return from_epoch_seconds(n);
            }
        }
    }
    None
}

/// First non-blank string among the candidates
pub fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|s| *s)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_from_float() {
        let json = serde_json::json!(42.5);
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_string() {
        let json = serde_json::json!("42.5");
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_invalid() {
        let json = serde_json::json!("invalid");
        assert_eq!(num(&json), None);
    }

    #[test]
    fn test_f_pick_alternative_keys() {
        let json = serde_json::json!({"lat": 48.8566, "lng": 2.3522});
        assert_eq!(f_pick(&json, &["latitude", "lat"]), Some(48.8566));
        assert_eq!(f_pick(&json, &["longitude", "lon", "lng"]), Some(2.3522));
        assert_eq!(f_pick(&json, &["elevation"]), None);
    }

    #[test]
    fn test_s_pick_finds_first() {
        let json = serde_json::json!({"name": "test", "title": "backup"});
        assert_eq!(s_pick(&json, &["name", "title"]), Some("test".to_string()));
    }

    #[test]
    fn test_s_pick_skips_blank() {
        let json = serde_json::json!({"name": "  ", "title": "backup"});
        assert_eq!(
            s_pick(&json, &["name", "title"]),
            Some("backup".to_string())
        );
    }

    #[test]
    fn test_s_pick_not_found() {
        let json = serde_json::json!({"other": "value"});
        assert_eq!(s_pick(&json, &["name", "title"]), None);
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_time("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_time("2024-01-15T11:30:00+01:00"), Some(expected));
        assert_eq!(parse_time("2024-01-15T10:30:00.000"), Some(expected));
        assert_eq!(parse_time("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn test_t_pick_from_unix_timestamp() {
        let json = serde_json::json!({"timestamp": 1705314600});
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(t_pick(&json, &["timestamp"]), Some(expected));
    }

    #[test]
    fn test_t_pick_not_found() {
        let json = serde_json::json!({"other": "value"});
        assert_eq!(t_pick(&json, &["timestamp"]), None);
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(&[None, Some(" "), Some("A12")]), Some("A12"));
        assert_eq!(first_non_empty(&[None, Some("")]), None);
    }
}
