use serde::{Deserialize, Serialize};

use crate::models::{Person, PersonId, UserId};

/// The signed-in user performing edits, as resolved from session state by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    pub user_id: UserId,
    /// The person node this user claimed in the tree, if any.
    pub person_id: Option<PersonId>,
    /// Whether this user owns the family tree being edited.
    pub is_tree_owner: bool,
}

impl ActingUser {
    pub fn is_self(&self, person: &Person) -> bool {
        self.person_id == Some(person.id)
            || person.attributes.owner_user_id == Some(self.user_id)
    }

    /// Only the tree owner may remove people who have claimed an active account.
    pub fn may_remove_claimed_account(&self) -> bool {
        self.is_tree_owner
    }
}
