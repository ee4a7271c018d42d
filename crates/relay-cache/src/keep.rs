use std::time::Duration;

/// Retention used when the configured keep value is `-1`.
pub const FOREVER: Duration = Duration::from_secs(9999 * 24 * 60 * 60);

/// How long a cache entry is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    Ttl(Duration),
    /// Stored without an expiry.
    Persist,
}

impl Keep {
    /// Maps a configured keep value: `> 0` seconds, `0` no expiry, `< 0` forever.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s > 0 => Self::Ttl(Duration::from_secs(s.unsigned_abs())),
            0 => Self::Persist,
            _ => Self::Ttl(FOREVER),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Ttl(d) => Some(*d),
            Self::Persist => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs() {
        assert_eq!(Keep::from_secs(600), Keep::Ttl(Duration::from_secs(600)));
        assert_eq!(Keep::from_secs(0), Keep::Persist);
        assert_eq!(Keep::from_secs(-1), Keep::Ttl(FOREVER));
        assert_eq!(Keep::from_secs(-1).ttl().unwrap().as_secs(), 863_913_600);
    }
}
