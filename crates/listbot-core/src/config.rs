use std::{env, fmt, fs, path::Path, str::FromStr, time::Duration};

use crate::{commands::DEFAULT_REPLY_LIMIT, errors::Error, Result};

const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

/// Typed configuration, sourced from the environment (and `.env` if present).
#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,

    /// How long a single `getUpdates` call may wait for new data.
    pub poll_timeout: Duration,
    /// Fixed pause after a failed fetch before retrying.
    pub retry_delay: Duration,
    /// Longest reply, in UTF-16 code units, before it is truncated.
    pub reply_limit: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .field("retry_delay", &self.retry_delay)
            .field("reply_limit", &self.reply_limit)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| lookup("TELEGRAM_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let poll_timeout = Duration::from_secs(
            parse_whole(&lookup, "POLL_TIMEOUT_SECS")?.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
        );
        let retry_delay = Duration::from_secs(
            parse_whole(&lookup, "POLL_RETRY_DELAY_SECS")?.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
        );
        let reply_limit =
            parse_whole(&lookup, "TELEGRAM_SAFE_LIMIT")?.unwrap_or(DEFAULT_REPLY_LIMIT);

        Ok(Self {
            telegram_bot_token: telegram_bot_token.trim().to_string(),
            poll_timeout,
            retry_delay,
            reply_limit,
        })
    }
}

fn parse_whole<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a whole number, got {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_and_alias() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.telegram_bot_token, "123:abc");
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retry_delay, Duration::from_secs(3));
        assert_eq!(cfg.reply_limit, 4000);
    }

    #[test]
    fn overrides_and_invalid_numbers() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("POLL_TIMEOUT_SECS", "10"),
            ("POLL_RETRY_DELAY_SECS", "1"),
            ("TELEGRAM_SAFE_LIMIT", "3500"),
        ]))
        .unwrap();
        assert_eq!(cfg.poll_timeout, Duration::from_secs(10));
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.reply_limit, 3500);

        let err = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("POLL_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "secret-token")])).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_BOT_TOKEN=\"abc\"\nexport POLL_TIMEOUT_SECS = '5'\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc".to_string()),
                ("POLL_TIMEOUT_SECS".to_string(), "5".to_string()),
            ]
        );
    }
}
