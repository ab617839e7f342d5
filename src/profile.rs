use crate::entity::{AgeBracket, Gender, Profile, UserId};
use std::collections::HashMap;

/// Answers collected so far during the intake questionnaire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub gender: Option<Gender>,
    pub age: Option<AgeBracket>,
}

impl ProfileDraft {
    pub fn complete(&self) -> Option<Profile> {
        Some(Profile::new(self.gender?, self.age?))
    }
}

#[derive(Debug, Default)]
pub struct ProfileStore {
    drafts: HashMap<UserId, ProfileDraft>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh questionnaire; any gender answer restarts the age question too.
    pub fn set_gender(&mut self, user: UserId, gender: Gender) {
        self.drafts.insert(
            user,
            ProfileDraft {
                gender: Some(gender),
                age: None,
            },
        );
    }

    pub fn set_age(&mut self, user: UserId, age: AgeBracket) {
        self.drafts.entry(user).or_default().age = Some(age);
    }

    pub fn get(&self, user: UserId) -> Option<Profile> {
        self.drafts.get(&user).and_then(ProfileDraft::complete)
    }

    pub fn draft(&self, user: UserId) -> ProfileDraft {
        self.drafts.get(&user).copied().unwrap_or_default()
    }

    pub fn clear(&mut self, user: UserId) {
        self.drafts.remove(&user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_available_only_once_both_answers_are_in() {
        let mut store = ProfileStore::new();
        let user = UserId(1);
        assert_eq!(store.get(user), None);

        store.set_gender(user, Gender::Female);
        assert_eq!(store.get(user), None);

        store.set_age(user, AgeBracket::Under18);
        assert_eq!(
            store.get(user),
            Some(Profile::new(Gender::Female, AgeBracket::Under18))
        );

        store.clear(user);
        assert_eq!(store.get(user), None);
    }

    #[test]
    fn answering_gender_again_resets_age() {
        let mut store = ProfileStore::new();
        let user = UserId(2);
        store.set_gender(user, Gender::Male);
        store.set_age(user, AgeBracket::Adult);
        store.set_gender(user, Gender::Female);
        assert_eq!(store.draft(user).age, None);
    }
}
