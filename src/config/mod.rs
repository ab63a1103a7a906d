/// Application configuration module
use std::collections::HashMap;
use std::env;

pub const DEFAULT_PROVIDER_PRIORITY: &str =
    "airframes,flightaware,aviationstack,flightradar24,airnav,adsbim,adsblol,opensky";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub provider_priority: Vec<String>,
    pub api_keys: ApiKeys,
    pub airframes_api_url: String,
    /// `<PROVIDER>_BASE_URL` overrides keyed by provider name
    pub provider_base_urls: HashMap<String, String>,
    pub http_timeout_seconds: Option<u64>,
    pub default_flight_count: usize,
    pub board: BoardSettings,
}

/// Per-provider API keys; `None` when unset or blank
#[derive(Clone, Debug, Default)]
pub struct ApiKeys {
    pub airframes: Option<String>,
    pub flightaware: Option<String>,
    pub flightradar24: Option<String>,
    pub airnav: Option<String>,
    pub aviationstack: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BoardSettings {
    pub airports: Vec<String>,
    pub flights_per_board: usize,
    pub tick_seconds: u64,
    pub refresh_seconds: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let provider_priority = parse_priority(
            &env::var("FLIGHT_PROVIDER_PRIORITY")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_PRIORITY.to_string()),
        );

        let api_keys = ApiKeys {
            airframes: env_key("AIRFRAMES_API_KEY"),
            flightaware: env_key("FLIGHTAWARE_API_KEY"),
            flightradar24: env_key("FLIGHTRADAR24_API_KEY"),
            airnav: env_key("AIRNAV_API_KEY"),
            aviationstack: env_key("AVIATIONSTACK_API_KEY"),
        };

        let airframes_api_url = env::var("AIRFRAMES_API_URL")
            .unwrap_or_else(|_| "https://api.airframes.io".to_string());

        let provider_base_urls = parse_list(DEFAULT_PROVIDER_PRIORITY)
            .into_iter()
            .filter_map(|name| {
                let url = env_key(&format!("{}_BASE_URL", name.to_ascii_uppercase()))?;
                Some((name, url))
            })
            .collect();

        let http_timeout_seconds = env::var("HTTP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok());

        let board = BoardSettings {
            airports: parse_list(&env::var("BOARD_AIRPORTS").unwrap_or_else(|_| "KSMF".into()))
                .into_iter()
                .map(|code| code.to_ascii_uppercase())
                .collect(),
            flights_per_board: env_u64("BOARD_FLIGHTS", 25) as usize,
            tick_seconds: env_u64("BOARD_TICK_SECONDS", 10),
            refresh_seconds: env_u64("BOARD_REFRESH_SECONDS", 120),
        };

        if board.tick_seconds == 0 || board.refresh_seconds == 0 {
            anyhow::bail!("BOARD_TICK_SECONDS and BOARD_REFRESH_SECONDS must be positive");
        }

        Ok(Self {
            bind_addr,
            provider_priority,
            api_keys,
            airframes_api_url,
            provider_base_urls,
            http_timeout_seconds,
            default_flight_count: env_u64("DEFAULT_FLIGHT_COUNT", 20) as usize,
            board,
        })
    }
}

/// Split a comma separated provider list, lowercasing each name.
/// A blank string falls back to the default ordering.
pub fn parse_priority(raw: &str) -> Vec<String> {
    let names: Vec<String> = parse_list(raw)
        .into_iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();
    if names.is_empty() {
        return parse_list(DEFAULT_PROVIDER_PRIORITY);
    }
    names
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_key(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority_trims_and_lowercases() {
        assert_eq!(
            parse_priority(" OpenSky , adsbim,,FlightAware "),
            vec!["opensky", "adsbim", "flightaware"]
        );
    }

    #[test]
    fn test_parse_priority_blank_uses_default() {
        let names = parse_priority(" , ");
        assert_eq!(names.first().map(String::as_str), Some("airframes"));
        assert_eq!(names.last().map(String::as_str), Some("opensky"));
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        env::set_var("FLIGHTBOARD_TEST_U64", "not-a-number");
        assert_eq!(env_u64("FLIGHTBOARD_TEST_U64", 7), 7);
        env::set_var("FLIGHTBOARD_TEST_U64", "42");
        assert_eq!(env_u64("FLIGHTBOARD_TEST_U64", 7), 42);
    }

    #[test]
    fn test_env_key_blank_is_unset() {
        env::set_var("FLIGHTBOARD_TEST_KEY", "   ");
        assert_eq!(env_key("FLIGHTBOARD_TEST_KEY"), None);
    }
}
