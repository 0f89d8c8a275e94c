use socialgram_common::{
    model::{Id, SocialgramSnowflakeGenerator},
    snowflake::{ProcessId, WorkerId},
};
use std::sync::{Mutex, PoisonError};

/// Shared source of entity ids for all stores of one client.
#[derive(Debug)]
pub struct IdGenerator {
    snowflake_generator: Mutex<SocialgramSnowflakeGenerator>,
}

impl IdGenerator {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            snowflake_generator: Mutex::new(SocialgramSnowflakeGenerator::new(
                worker_id, process_id,
            )),
        }
    }

    pub fn generate<Marker>(&self) -> Id<Marker> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .into()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::ids::IdGenerator;
    use socialgram_common::model::{Id, post::PostMarker, user::UserMarker};

    #[test]
    fn ids_are_unique_across_markers() {
        let ids = IdGenerator::default();

        let user: Id<UserMarker> = ids.generate();
        let post: Id<PostMarker> = ids.generate();
        let other_user: Id<UserMarker> = ids.generate();

        assert_ne!(u64::from(user), u64::from(post));
        assert!(other_user > user);
    }
}
