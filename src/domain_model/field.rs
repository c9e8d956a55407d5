use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Attributes of a user that a caller may ask for.
///
/// `Relation` has no stored column; selecting it asks for a relation summary per row.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum UserField {
    Id,
    FullName,
    Username,
    AccountType,
    Dob,
    Gender,
    Profession,
    Bio,
    Avatar,
    Banner,
    PostsCount,
    FollowersCount,
    FollowingCount,
    Relation,
}

impl UserField {
    pub const DEFAULTS: [UserField; 4] = [
        UserField::Id,
        UserField::FullName,
        UserField::Username,
        UserField::Avatar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::FullName => "full_name",
            UserField::Username => "username",
            UserField::AccountType => "account_type",
            UserField::Dob => "dob",
            UserField::Gender => "gender",
            UserField::Profession => "profession",
            UserField::Bio => "bio",
            UserField::Avatar => "avatar",
            UserField::Banner => "banner",
            UserField::PostsCount => "posts_count",
            UserField::FollowersCount => "followers_count",
            UserField::FollowingCount => "following_count",
            UserField::Relation => "relation",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for UserField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "id" => UserField::Id,
            "full_name" => UserField::FullName,
            "username" => UserField::Username,
            "account_type" => UserField::AccountType,
            "dob" => UserField::Dob,
            "gender" => UserField::Gender,
            "profession" => UserField::Profession,
            "bio" => UserField::Bio,
            "avatar" => UserField::Avatar,
            "banner" => UserField::Banner,
            "posts_count" => UserField::PostsCount,
            "followers_count" => UserField::FollowersCount,
            "following_count" => UserField::FollowingCount,
            "relation" => UserField::Relation,
            other => return Err(UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// The set of user attributes a response carries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldSelection(BTreeSet<UserField>);

impl FieldSelection {
    /// Default attributes only.
    pub fn defaults() -> Self {
        Self(UserField::DEFAULTS.into_iter().collect())
    }

    /// Default attributes plus every requested name; any name outside the allow-list
    /// rejects the whole selection.
    pub fn parse<S: AsRef<str>>(requested: &[S]) -> Result<Self, UnknownField> {
        let mut selection = Self::defaults();
        for name in requested {
            selection.0.insert(name.as_ref().trim().parse()?);
        }
        Ok(selection)
    }

    /// Exactly the given attributes, without the defaults.
    pub fn exact(fields: impl IntoIterator<Item = UserField>) -> Self {
        Self(fields.into_iter().collect())
    }

    pub fn with(mut self, field: UserField) -> Self {
        self.0.insert(field);
        self
    }

    pub fn contains(&self, field: UserField) -> bool {
        self.0.contains(&field)
    }

    pub fn wants_relation(&self) -> bool {
        self.contains(UserField::Relation)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(UserField::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_yields_defaults() {
        let selection = FieldSelection::parse::<&str>(&[]).unwrap();
        assert_eq!(selection, FieldSelection::defaults());
        assert!(!selection.wants_relation());
    }

    #[test]
    fn requested_fields_extend_defaults() {
        let selection = FieldSelection::parse(&["bio", "relation"]).unwrap();
        for field in UserField::DEFAULTS {
            assert!(selection.contains(field));
        }
        assert!(selection.contains(UserField::Bio));
        assert!(selection.wants_relation());
        assert!(!selection.contains(UserField::Banner));
    }

    #[test]
    fn unknown_field_rejects_selection() {
        let err = FieldSelection::parse(&["bio", "password"]).unwrap_err();
        assert_eq!(err, UnknownField("password".to_string()));

        let err = FieldSelection::parse(&["id; DROP TABLE users"]).unwrap_err();
        assert_eq!(err.0, "id; DROP TABLE users");
    }

    #[test]
    fn field_names_round_trip() {
        for name in ["id", "dob", "followers_count", "relation"] {
            assert_eq!(name.parse::<UserField>().unwrap().as_str(), name);
        }
    }
}
