use thiserror::Error;
use time::Duration;

/// A strictly positive span of time, e.g. a polling interval.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// The same span as a [`std::time::Duration`], for use with timers.
    #[must_use]
    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::try_from(self.0).expect("Positive durations are representable.")
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Whether `needle` occurs in `haystack`, ignoring case.
///
/// An empty needle never matches.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use crate::util::{NonPositiveDurationError, PositiveDuration, contains_ignore_case};
    use time::Duration;

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::seconds(-1)).is_none());
        assert_eq!(
            PositiveDuration::try_from(Duration::milliseconds(-5)),
            Err(NonPositiveDurationError(Duration::milliseconds(-5)))
        );

        let second = PositiveDuration::try_from(Duration::milliseconds(1000)).unwrap();
        assert_eq!(second.get(), Duration::SECOND);
        assert_eq!(second.to_std(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn case_insensitive_contains() {
        assert!(contains_ignore_case("Alicia", "ali"));
        assert!(contains_ignore_case("alice", "ALI"));
        assert!(!contains_ignore_case("bob", "ali"));
        assert!(!contains_ignore_case("bob", ""));
    }
}
