use serde::Serialize;

/// State of a stored follow or mate edge. A missing row means no edge.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EdgeState {
    Pending,
    Confirmed,
}

impl EdgeState {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, EdgeState::Confirmed)
    }
}

impl From<bool> for EdgeState {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            EdgeState::Confirmed
        } else {
            EdgeState::Pending
        }
    }
}

/// Relationship between a caller and another user, as shown next to profiles.
///
/// `None` means the relation was not checked because one side is unknown.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct RelationSummary {
    pub is_following: Option<bool>,
    pub is_followed: Option<bool>,
    pub are_mates: Option<bool>,
}

impl RelationSummary {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn resolved(
        following: Option<EdgeState>,
        followed: Option<EdgeState>,
        mates: Option<EdgeState>,
    ) -> Self {
        let confirmed = |state: Option<EdgeState>| Some(state.is_some_and(|s| s.is_confirmed()));
        Self {
            is_following: confirmed(following),
            is_followed: confirmed(followed),
            are_mates: confirmed(mates),
        }
    }
}
