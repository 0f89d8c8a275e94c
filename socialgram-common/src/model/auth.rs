use std::fmt::{Debug, Formatter};

/// An account credential.
///
/// Credentials are kept and compared verbatim; only `Debug` output is redacted.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: String) -> Self {
        Self(password)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::auth::Password;

    #[test]
    fn debug_is_redacted() {
        let password = Password::new("hunter2".to_owned());

        assert!(password.matches("hunter2"));
        assert!(!password.matches("Hunter2"));
        assert!(!format!("{password:?}").contains("hunter2"));
    }
}
