use crate::{
    model::{
        Id, ModelValidationError,
        auth::Password,
        post::PostMarker,
        require_non_empty,
    },
    util::contains_ignore_case,
};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: String,
    pub username: UserHandle,
    pub full_name: String,
    pub password: Password,
    pub description: String,
    pub followers: BTreeSet<Id<UserMarker>>,
    pub following: BTreeSet<Id<UserMarker>>,
    pub posts: BTreeSet<Id<PostMarker>>,
}

impl User {
    /// A freshly registered account with an empty social graph.
    #[must_use]
    pub fn new(id: Id<UserMarker>, registration: CreateUser) -> Self {
        Self {
            id,
            email: registration.email,
            username: registration.username,
            full_name: registration.full_name,
            password: registration.password,
            description: String::new(),
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            posts: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_following(&self, other: Id<UserMarker>) -> bool {
        self.following.contains(&other)
    }

    /// Case-insensitive match of `query` against the handle or the full name.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        contains_ignore_case(self.username.get(), query)
            || contains_ignore_case(&self.full_name, query)
    }
}

/// A validated account registration.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub email: String,
    pub username: UserHandle,
    pub password: Password,
    pub full_name: String,
}

impl CreateUser {
    /// Checks that every field is filled in and that the username is a valid handle.
    pub fn new(
        email: String,
        username: String,
        password: String,
        full_name: String,
    ) -> Result<Self, ModelValidationError> {
        Ok(Self {
            email: require_non_empty("email", email)?,
            username: UserHandle::new(require_non_empty("username", username)?)?,
            password: Password::new(require_non_empty("password", password)?),
            full_name: require_non_empty("full_name", full_name)?,
        })
    }
}

/// Partial profile edit; `None` leaves the field as it is.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub description: Option<String>,
}

impl UpdateProfile {
    pub fn apply_to(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(description) = self.description {
            user.description = description;
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user handle is invalid: {0}")]
pub struct InvalidUserHandleError(String);

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        let length = handle.chars().count();
        if length > 0 && length <= USER_HANDLE_MAX_LEN {
            Ok(UserHandle(handle))
        } else {
            Err(InvalidUserHandleError(handle))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserHandle {
    type Error = InvalidUserHandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Display for UserHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for UserHandle {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        ModelValidationError,
        user::{CreateUser, USER_HANDLE_MAX_LEN, UpdateProfile, User, UserHandle},
    };

    fn registration() -> CreateUser {
        CreateUser::new(
            "a@x.com".to_owned(),
            "alice".to_owned(),
            "pw".to_owned(),
            "Alice Liddell".to_owned(),
        )
        .unwrap()
    }

    #[test]
    fn handle_length() {
        assert!(UserHandle::new(String::new()).is_err());
        assert!(UserHandle::new("a".repeat(USER_HANDLE_MAX_LEN)).is_ok());
        assert!(UserHandle::new("a".repeat(USER_HANDLE_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn registration_requires_every_field() {
        let result = CreateUser::new(
            "a@x.com".to_owned(),
            "alice".to_owned(),
            String::new(),
            "Alice".to_owned(),
        );
        assert_eq!(result, Err(ModelValidationError::EmptyField("password")));
    }

    #[test]
    fn query_matches_handle_or_name() {
        let user = User::new(1_u64.into(), registration());

        assert!(user.matches_query("ALI"));
        assert!(user.matches_query("liddell"));
        assert!(!user.matches_query("bob"));
        assert!(!user.matches_query(""));
    }

    #[test]
    fn partial_profile_update() {
        let mut user = User::new(1_u64.into(), registration());

        UpdateProfile {
            full_name: None,
            description: Some("Down the rabbit hole".to_owned()),
        }
        .apply_to(&mut user);

        assert_eq!(user.full_name, "Alice Liddell");
        assert_eq!(user.description, "Down the rabbit hole");
    }
}
