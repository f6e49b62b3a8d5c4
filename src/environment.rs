use std::env;
use std::str::FromStr;
use tracing::warn;

/// Retrieves an environment variable, falling back to `default` when unset or empty.
pub fn get_env_var_or(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Retrieves and parses an environment variable.
///
/// Unset variables silently use `default`; values that fail to parse are
/// logged and also fall back to `default`.
pub fn get_env_var_parsed<T>(var: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "Invalid value '{}' for {}, using default {}",
                    value, var, default
                );
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vars_use_defaults() {
        assert_eq!(
            get_env_var_or("BIASLENS_TEST_SURELY_UNSET", "fallback"),
            "fallback"
        );
        assert_eq!(get_env_var_parsed("BIASLENS_TEST_SURELY_UNSET_NUM", 7usize), 7);
    }

    #[test]
    fn test_unparseable_value_uses_default() {
        env::set_var("BIASLENS_TEST_BAD_NUMBER", "seven");
        assert_eq!(get_env_var_parsed("BIASLENS_TEST_BAD_NUMBER", 3u64), 3);
        env::set_var("BIASLENS_TEST_GOOD_NUMBER", " 12 ");
        assert_eq!(get_env_var_parsed("BIASLENS_TEST_GOOD_NUMBER", 3u64), 12);
    }
}
