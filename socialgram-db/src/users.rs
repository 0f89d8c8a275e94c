use crate::{
    codec::{self, CURRENT_USER_KEY, USERS_KEY, encode_collection, load_collection},
    error::{Result, StoreError},
    gateway::{PersistenceGateway, Scope, write_entities},
    ids::IdGenerator,
    record::UserRecord,
};
use socialgram_common::model::{
    Id,
    post::PostMarker,
    user::{CreateUser, UpdateProfile, User, UserMarker},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
struct UserState {
    users: Vec<User>,
    session: Option<Id<UserMarker>>,
}

impl UserState {
    fn position(&self, user_id: Id<UserMarker>) -> Result<usize> {
        self.users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or(StoreError::UserByIdNotFound(user_id))
    }

    fn find(&self, user_id: Id<UserMarker>) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }
}

/// Accounts, the signed-in session and the follower graph.
///
/// Every mutation computes the next collection on a copy, writes it through the gateway and only
/// then replaces the in-memory state.
#[derive(Debug)]
pub struct UserStore {
    gateway: Arc<dyn PersistenceGateway>,
    ids: Arc<IdGenerator>,
    state: Mutex<UserState>,
}

impl UserStore {
    pub fn load(gateway: Arc<dyn PersistenceGateway>, ids: Arc<IdGenerator>) -> Result<Self> {
        let users =
            load_collection::<UserRecord, User>(&*gateway, USERS_KEY)?.unwrap_or_default();

        let session = match gateway.load(Scope::Entities, CURRENT_USER_KEY)? {
            Some(bytes) => match codec::decode::<UserRecord>(&bytes) {
                Ok(record) => users
                    .iter()
                    .any(|user| user.id == record.id)
                    .then_some(record.id),
                Err(error) => {
                    warn!(%error, "Discarding undecodable session");
                    None
                }
            },
            None => None,
        };

        info!(users = users.len(), signed_in = session.is_some(), "Loaded users");

        Ok(Self {
            gateway,
            ids,
            state: Mutex::new(UserState { users, session }),
        })
    }

    /// The encoded session record, or `None` when nobody is signed in.
    fn encode_session(state: &UserState) -> Result<Option<Vec<u8>>> {
        let user = state.session.and_then(|session| state.find(session));
        Ok(user
            .map(|user| codec::encode(&UserRecord::from(user)))
            .transpose()?)
    }

    fn persist_session(&self, state: &UserState) -> Result<()> {
        let session = Self::encode_session(state)?;
        write_entities(&*self.gateway, &[(CURRENT_USER_KEY, session.as_deref())])?;
        Ok(())
    }

    fn commit(&self, current: &mut UserState, next: UserState) -> Result<()> {
        let users = encode_collection::<_, UserRecord>(&next.users)?;
        let session = Self::encode_session(&next)?;

        let mut writes = vec![(USERS_KEY, Some(users.as_slice()))];
        if next.session.is_some() || current.session.is_some() {
            writes.push((CURRENT_USER_KEY, session.as_deref()));
        }
        write_entities(&*self.gateway, &writes)?;

        *current = next;
        Ok(())
    }

    /// Creates an account and signs it in.
    pub async fn register(
        &self,
        email: String,
        username: String,
        password: String,
        full_name: String,
    ) -> Result<Id<UserMarker>> {
        let registration = CreateUser::new(email, username, password, full_name)?;

        let mut state = self.state.lock().await;

        let taken = state.users.iter().any(|user| {
            user.email == registration.email || user.username == registration.username
        });
        if taken {
            return Err(StoreError::DuplicateIdentity);
        }

        let user_id = self.ids.generate();
        let user = User::new(user_id, registration);
        debug!(%user_id, username = %user.username, "Registering user");

        let mut next = state.clone();
        next.users.push(user);
        next.session = Some(user_id);
        self.commit(&mut state, next)?;

        Ok(user_id)
    }

    /// Signs in the account whose email and password both match exactly.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Id<UserMarker>> {
        let mut state = self.state.lock().await;

        let user_id = state
            .users
            .iter()
            .find(|user| user.email == email && user.password.matches(password))
            .map(|user| user.id)
            .ok_or(StoreError::InvalidCredentials)?;

        let mut next = state.clone();
        next.session = Some(user_id);
        self.persist_session(&next)?;
        *state = next;

        debug!(%user_id, "Signed in");
        Ok(user_id)
    }

    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        self.gateway.remove(Scope::Entities, CURRENT_USER_KEY)?;
        if let Some(user_id) = state.session.take() {
            debug!(%user_id, "Signed out");
        }

        Ok(())
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        let state = self.state.lock().await;
        state.session.and_then(|session| state.find(session)).cloned()
    }

    pub async fn update_profile(
        &self,
        user_id: Id<UserMarker>,
        update: UpdateProfile,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let index = state.position(user_id)?;

        let mut next = state.clone();
        update.apply_to(&mut next.users[index]);
        self.commit(&mut state, next)?;

        debug!(%user_id, "Updated profile");
        Ok(())
    }

    /// Makes `actor_id` follow or unfollow `target_id`.
    ///
    /// Both sides of the relation change together. Requesting the state that already holds is a
    /// no-op and writes nothing.
    pub async fn set_following(
        &self,
        actor_id: Id<UserMarker>,
        target_id: Id<UserMarker>,
        follow: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let actor_index = state.position(actor_id)?;
        let target_index = state.position(target_id)?;

        if actor_id == target_id {
            return if follow {
                Err(StoreError::SelfFollow)
            } else {
                Ok(())
            };
        }

        if state.users[actor_index].is_following(target_id) == follow {
            return Ok(());
        }

        let mut next = state.clone();
        if follow {
            next.users[actor_index].following.insert(target_id);
            next.users[target_index].followers.insert(actor_id);
        } else {
            next.users[actor_index].following.remove(&target_id);
            next.users[target_index].followers.remove(&actor_id);
        }
        self.commit(&mut state, next)?;

        debug!(%actor_id, %target_id, follow, "Changed follow state");
        Ok(())
    }

    pub async fn is_following(&self, actor_id: Id<UserMarker>, target_id: Id<UserMarker>) -> bool {
        let state = self.state.lock().await;
        state
            .find(actor_id)
            .is_some_and(|actor| actor.is_following(target_id))
    }

    /// Users whose handle or full name contains `query`, ignoring case, in registration order.
    ///
    /// An empty query finds nobody; `excluding` is never part of the result.
    pub async fn search(&self, query: &str, excluding: Id<UserMarker>) -> Vec<User> {
        if query.is_empty() {
            return Vec::new();
        }

        let state = self.state.lock().await;
        state
            .users
            .iter()
            .filter(|user| user.id != excluding && user.matches_query(query))
            .cloned()
            .collect()
    }

    /// Adds a published post to its author's post set.
    pub async fn record_post(&self, username: &str, post_id: Id<PostMarker>) -> Result<()> {
        let mut state = self.state.lock().await;
        let index = state
            .users
            .iter()
            .position(|user| user.username == *username)
            .ok_or_else(|| StoreError::UserByUsernameNotFound(username.to_owned()))?;

        if state.users[index].posts.contains(&post_id) {
            return Ok(());
        }

        let mut next = state.clone();
        next.users[index].posts.insert(post_id);
        self.commit(&mut state, next)
    }

    pub async fn user(&self, user_id: Id<UserMarker>) -> Option<User> {
        self.state.lock().await.find(user_id).cloned()
    }

    pub async fn user_by_username(&self, username: &str) -> Option<User> {
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|user| user.username == *username)
            .cloned()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        codec::{CURRENT_USER_KEY, USERS_KEY},
        error::StoreError,
        gateway::{MemoryGateway, PersistenceGateway, Scope, testing::FailingGateway},
        ids::IdGenerator,
        users::UserStore,
    };
    use socialgram_common::model::{
        Id,
        user::{UpdateProfile, UserMarker},
    };
    use std::sync::Arc;

    fn store(gateway: &Arc<MemoryGateway>) -> UserStore {
        UserStore::load(gateway.clone(), Arc::new(IdGenerator::default())).unwrap()
    }

    async fn register(
        store: &UserStore,
        username: &str,
        full_name: &str,
    ) -> Result<Id<UserMarker>, StoreError> {
        store
            .register(
                format!("{username}@x.com"),
                username.to_owned(),
                "pw".to_owned(),
                full_name.to_owned(),
            )
            .await
    }

    #[tokio::test]
    async fn register_signs_in_and_persists() {
        let gateway = Arc::new(MemoryGateway::new());
        let users = store(&gateway);

        let alice = register(&users, "alice", "Alice").await.unwrap();

        assert_eq!(users.current_user().await.unwrap().id, alice);
        assert!(gateway.load(Scope::Entities, USERS_KEY).unwrap().is_some());
        assert!(gateway.load(Scope::Entities, CURRENT_USER_KEY).unwrap().is_some());

        let reloaded = store(&gateway);
        assert_eq!(reloaded.users().await, users.users().await);
        assert_eq!(reloaded.current_user().await.map(|user| user.id), Some(alice));
    }

    #[tokio::test]
    async fn empty_fields_fail_validation() {
        let users = store(&Arc::new(MemoryGateway::new()));

        let result = users
            .register(
                "a@x.com".to_owned(),
                String::new(),
                "pw".to_owned(),
                "Alice".to_owned(),
            )
            .await;

        assert!(matches!(result, Err(StoreError::ValidationFailed(_))));
        assert!(users.users().await.is_empty());
        assert!(users.current_user().await.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let users = store(&Arc::new(MemoryGateway::new()));

        let register_alice = |username: &'static str| {
            users.register(
                "a@x.com".to_owned(),
                username.to_owned(),
                "pw".to_owned(),
                "Alice".to_owned(),
            )
        };

        register_alice("alice").await.unwrap();
        let second = register_alice("alice2").await;

        assert!(matches!(second, Err(StoreError::DuplicateIdentity)));
        let with_email = users
            .users()
            .await
            .into_iter()
            .filter(|user| user.email == "a@x.com")
            .count();
        assert_eq!(with_email, 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_case_sensitively() {
        let users = store(&Arc::new(MemoryGateway::new()));

        register(&users, "alice", "Alice").await.unwrap();
        assert!(matches!(
            users
                .register(
                    "other@x.com".to_owned(),
                    "alice".to_owned(),
                    "pw".to_owned(),
                    "Other".to_owned()
                )
                .await,
            Err(StoreError::DuplicateIdentity)
        ));
        register(&users, "Alice", "Other Alice").await.unwrap();
    }

    #[tokio::test]
    async fn authenticate_and_logout() {
        let gateway = Arc::new(MemoryGateway::new());
        let users = store(&gateway);
        let alice = register(&users, "alice", "Alice").await.unwrap();

        users.logout().await.unwrap();
        assert!(users.current_user().await.is_none());
        assert!(gateway.load(Scope::Entities, CURRENT_USER_KEY).unwrap().is_none());

        assert!(matches!(
            users.authenticate("alice@x.com", "PW").await,
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            users.authenticate("bob@x.com", "pw").await,
            Err(StoreError::InvalidCredentials)
        ));
        assert!(users.current_user().await.is_none());

        assert_eq!(users.authenticate("alice@x.com", "pw").await.unwrap(), alice);
        assert_eq!(users.current_user().await.unwrap().id, alice);
    }

    #[tokio::test]
    async fn follow_is_symmetric_and_idempotent() {
        let gateway = Arc::new(MemoryGateway::new());
        let users = store(&gateway);
        let alice = register(&users, "alice", "Alice").await.unwrap();
        let bob = register(&users, "bob", "Bob").await.unwrap();

        users.set_following(alice, bob, true).await.unwrap();
        let after_first = users.users().await;
        let alice_user = users.user(alice).await.unwrap();
        let bob_user = users.user(bob).await.unwrap();
        assert!(alice_user.following.contains(&bob));
        assert!(bob_user.followers.contains(&alice));
        assert!(users.is_following(alice, bob).await);
        assert!(!users.is_following(bob, alice).await);

        users.set_following(alice, bob, true).await.unwrap();
        assert_eq!(users.users().await, after_first);

        users.set_following(alice, bob, false).await.unwrap();
        users.set_following(alice, bob, false).await.unwrap();
        assert!(users.user(alice).await.unwrap().following.is_empty());
        assert!(users.user(bob).await.unwrap().followers.is_empty());

        let reloaded = store(&gateway);
        assert_eq!(reloaded.users().await, users.users().await);
    }

    #[tokio::test]
    async fn follow_rejects_unknown_and_self() {
        let users = store(&Arc::new(MemoryGateway::new()));
        let alice = register(&users, "alice", "Alice").await.unwrap();

        let unknown = 42_u64.into();
        let error = users.set_following(alice, unknown, true).await.unwrap_err();
        assert!(error.is_not_found());

        let error = users.set_following(alice, alice, true).await.unwrap_err();
        assert!(matches!(error, StoreError::SelfFollow));
        assert!(error.is_validation());
        users.set_following(alice, alice, false).await.unwrap();
        assert!(users.user(alice).await.unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn search_matches_handle_or_name_and_excludes_self() {
        let users = store(&Arc::new(MemoryGateway::new()));
        let alice = register(&users, "alice", "Alice").await.unwrap();
        let alicia = register(&users, "Alicia", "Alicia Keys").await.unwrap();
        register(&users, "bob", "Bob").await.unwrap();
        let me = register(&users, "malika", "Me Myself").await.unwrap();

        let found: Vec<_> = users
            .search("ali", me)
            .await
            .into_iter()
            .map(|user| user.id)
            .collect();
        assert_eq!(found, vec![alice, alicia]);

        let by_name: Vec<_> = users
            .search("KEYS", me)
            .await
            .into_iter()
            .map(|user| user.id)
            .collect();
        assert_eq!(by_name, vec![alicia]);

        assert!(users.search("", me).await.is_empty());
    }

    #[tokio::test]
    async fn profile_update_is_partial() {
        let gateway = Arc::new(MemoryGateway::new());
        let users = store(&gateway);
        let alice = register(&users, "alice", "Alice").await.unwrap();

        users
            .update_profile(
                alice,
                UpdateProfile {
                    full_name: None,
                    description: Some("photographer".to_owned()),
                },
            )
            .await
            .unwrap();

        let user = users.current_user().await.unwrap();
        assert_eq!(user.full_name, "Alice");
        assert_eq!(user.description, "photographer");
        assert_eq!(user.username.get(), "alice");

        let reloaded = store(&gateway);
        assert_eq!(
            reloaded.current_user().await.unwrap().description,
            "photographer"
        );

        let missing = users
            .update_profile(7_u64.into(), UpdateProfile::default())
            .await;
        assert!(matches!(missing, Err(StoreError::UserByIdNotFound(_))));
    }

    #[tokio::test]
    async fn undecodable_users_start_empty() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .save(Scope::Entities, USERS_KEY, b"[{\"id\": \"nope\"}]")
            .unwrap();

        let users = store(&gateway);
        assert!(users.users().await.is_empty());

        register(&users, "alice", "Alice").await.unwrap();
        assert_eq!(store(&gateway).users().await.len(), 1);
    }

    #[tokio::test]
    async fn record_post_updates_author() {
        let users = store(&Arc::new(MemoryGateway::new()));
        let alice = register(&users, "alice", "Alice").await.unwrap();

        users.record_post("alice", 9_u64.into()).await.unwrap();
        assert!(users.user(alice).await.unwrap().posts.contains(&9_u64.into()));

        assert!(matches!(
            users.record_post("nobody", 9_u64.into()).await,
            Err(StoreError::UserByUsernameNotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_session_write_rolls_back_registration() {
        let gateway = Arc::new(FailingGateway::new(CURRENT_USER_KEY));
        let users = UserStore::load(gateway.clone(), Arc::new(IdGenerator::default())).unwrap();

        let result = users
            .register(
                "a@x.com".to_owned(),
                "alice".to_owned(),
                "pw".to_owned(),
                "Alice".to_owned(),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Gateway(_))));
        assert!(users.users().await.is_empty());
        assert!(users.current_user().await.is_none());
        assert_eq!(gateway.load(Scope::Entities, USERS_KEY).unwrap(), None);
    }
}
