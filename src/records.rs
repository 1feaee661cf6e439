//! Documents kept in the external store.
//!
//! Every record carries its key as `_id`; the store revision travels
//! separately in [`crate::store::Versioned`].

use serde::{Deserialize, Serialize};

/// Collections of the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Group,
    Location,
    Person,
    Meet,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Group => "group",
            Collection::Location => "location",
            Collection::Person => "person",
            Collection::Meet => "meet",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named group of users, keyed by group name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl GroupRecord {
    pub fn new(name: &str, creator: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            members: vec![creator.to_string()],
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Append a member; returns `false` when already present
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        true
    }

    /// Remove a member; returns `false` when not present
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != user_id);
        self.members.len() != before
    }
}

/// Last location shared by a user, keyed by user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

/// Display name of a user, populated outside this service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl PersonRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// An invitation sent to a group, tracking who accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub group: String,
    pub event: String,
    pub organizer: String,
    pub threshold: u32,
    #[serde(default)]
    pub accepted: Vec<String>,
}

impl MeetRecord {
    pub fn new(group: &str, event: &str, organizer: &str, threshold: u32) -> Self {
        Self {
            id: Self::key(group, event),
            group: group.to_string(),
            event: event.to_string(),
            organizer: organizer.to_string(),
            threshold,
            accepted: Vec::new(),
        }
    }

    /// Document id for a meet. Both parts are escaped so that `:` inside a
    /// group or event name cannot make two meets share an id.
    pub fn key(group: &str, event: &str) -> String {
        format!("{}:{}", escape_key_part(group), escape_key_part(event))
    }

    /// Record an acceptance; returns `false` when the user already accepted
    pub fn accept(&mut self, user_id: &str) -> bool {
        if self.accepted.iter().any(|u| u == user_id) {
            return false;
        }
        self.accepted.push(user_id.to_string());
        true
    }

    pub fn is_full(&self) -> bool {
        self.accepted.len() as u64 >= u64::from(self.threshold)
    }
}

fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}
