//! Environment variable utilities
//!
//! Typed lookups with defaults for the `UTH_*` knobs.
//!
//! ```ignore
//! use uthread_core::env::{env_get, env_get_bool};
//!
//! let max: usize = env_get("UTH_MAX_THREADS", 100);
//! let debug = env_get_bool("UTH_DEBUG", false);
//! ```
//!
//! None of these are safe to call from the preemption handler.

use std::str::FromStr;

/// Get an environment variable parsed as `T`, or `default` if unset or unparsable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get an environment variable as a boolean
///
/// "1", "true", "yes" and "on" (any case) are true, any other value is
/// false. Unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => parse_bool(&val),
        Err(_) => default,
    }
}

/// Get an environment variable parsed as `T` if set and valid
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get an environment variable as a lowercase string
pub fn env_get_lower(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_ascii_lowercase())
}

pub(crate) fn parse_bool(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_returns_default() {
        let val: usize = env_get("__UTH_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_bool("__UTH_TEST_UNSET__", true));
        assert!(env_get_opt::<u32>("__UTH_TEST_UNSET__").is_none());
        assert!(env_get_lower("__UTH_TEST_UNSET__").is_none());
    }

    #[test]
    fn test_parse_number() {
        std::env::set_var("__UTH_TEST_NUM__", " 250 ");
        let val: u64 = env_get("__UTH_TEST_NUM__", 0);
        assert_eq!(val, 250);
        std::env::remove_var("__UTH_TEST_NUM__");
    }

    #[test]
    fn test_invalid_number_falls_back() {
        std::env::set_var("__UTH_TEST_BAD__", "many");
        let val: usize = env_get("__UTH_TEST_BAD__", 7);
        assert_eq!(val, 7);
        std::env::remove_var("__UTH_TEST_BAD__");
    }

    #[test]
    fn test_bool_spellings() {
        for yes in ["1", "true", "TRUE", "yes", "On"] {
            assert!(parse_bool(yes), "{}", yes);
        }
        for no in ["0", "false", "off", "", "garbage"] {
            assert!(!parse_bool(no), "{}", no);
        }
    }

    #[test]
    fn test_lowercase_lookup() {
        std::env::set_var("__UTH_TEST_CLOCK__", "Real");
        assert_eq!(env_get_lower("__UTH_TEST_CLOCK__").as_deref(), Some("real"));
        std::env::remove_var("__UTH_TEST_CLOCK__");
    }
}
