use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap());
static RE_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{2})$").unwrap());

/// A tournament season key. Most seasons are a plain year (`2024`); early
/// editions that straddled a year boundary use the split form (`2007/08`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Season {
    Year(i32),
    Split(i32, u8),
}

impl Season {
    /// Parse a season string.
    ///
    /// Supported formats:
    /// - `2024` — single calendar year
    /// - `2007/08` — split season; the suffix must be the following year
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(caps) = RE_YEAR.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            return Ok(Season::Year(year));
        }

        if let Some(caps) = RE_SPLIT.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let suffix: u8 = caps[2].parse().unwrap();
            if i32::from(suffix) != (year + 1).rem_euclid(100) {
                return Err(Error::SeasonParse(format!(
                    "suffix does not follow the year: {s}"
                )));
            }
            return Ok(Season::Split(year, suffix));
        }

        Err(Error::SeasonParse(format!("unrecognized season: {s}")))
    }

    /// Canonical key string, matching how seasons are stored.
    pub fn to_key(&self) -> String {
        match self {
            Season::Year(y) => format!("{y}"),
            Season::Split(y, s) => format!("{y}/{s:02}"),
        }
    }

    /// The calendar year a season started in.
    pub fn start_year(&self) -> i32 {
        match self {
            Season::Year(y) | Season::Split(y, _) => *y,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(Season::parse("2024").unwrap(), Season::Year(2024));
        assert_eq!(Season::parse(" 2008 ").unwrap(), Season::Year(2008));
    }

    #[test]
    fn test_parse_split() {
        assert_eq!(Season::parse("2007/08").unwrap(), Season::Split(2007, 8));
        assert_eq!(Season::parse("1999/00").unwrap(), Season::Split(1999, 0));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Season::parse("garbage").is_err());
        assert!(Season::parse("24").is_err());
        assert!(Season::parse("2007/09").is_err());
        assert!(Season::parse("2007-08").is_err());
    }

    #[test]
    fn test_to_key() {
        assert_eq!(Season::Year(2024).to_key(), "2024");
        assert_eq!(Season::Split(2007, 8).to_key(), "2007/08");
        assert_eq!(Season::Split(1999, 0).to_key(), "1999/00");
    }

    #[test]
    fn test_start_year() {
        assert_eq!(Season::parse("2007/08").unwrap().start_year(), 2007);
        assert_eq!(Season::parse("2024").unwrap().start_year(), 2024);
    }
}
