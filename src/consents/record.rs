//! Consent records as returned by the authorization service
//!
//! A consent grants one scope to one client on behalf of an identity.
//! Dependent consents point at their ancestors through `dependency_path`.

use crate::error::ConsentForestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque consent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentId(pub u64);

impl fmt::Display for ConsentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConsentId {
    fn from(id: u64) -> Self {
        ConsentId(id)
    }
}

/// One granted authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: ConsentId,
    /// OAuth client the consent was granted to
    pub client: String,
    /// Scope string the consent covers
    #[serde(rename = "scope_name")]
    pub scope_value: String,
    /// Service-side scope identifier
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub effective_identity: Option<String>,
    /// Ancestor chain from the tree root down to and including this consent
    pub dependency_path: Vec<ConsentId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub atomically_revocable: bool,
    #[serde(default)]
    pub allows_refresh: bool,
    #[serde(default)]
    pub auto_approved: bool,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub last_used: Option<String>,
}

impl ConsentRecord {
    pub fn new(
        id: u64,
        client: impl Into<String>,
        scope_value: impl Into<String>,
        dependency_path: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            id: ConsentId(id),
            client: client.into(),
            scope_value: scope_value.into(),
            scope: None,
            effective_identity: None,
            dependency_path: dependency_path.into_iter().map(ConsentId).collect(),
            status: None,
            atomically_revocable: false,
            allows_refresh: false,
            auto_approved: false,
            created: None,
            updated: None,
            last_used: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_effective_identity(mut self, identity: impl Into<String>) -> Self {
        self.effective_identity = Some(identity.into());
        self
    }

    pub fn with_atomically_revocable(mut self, revocable: bool) -> Self {
        self.atomically_revocable = revocable;
        self
    }

    pub fn with_allows_refresh(mut self, allows_refresh: bool) -> Self {
        self.allows_refresh = allows_refresh;
        self
    }

    /// Check the `dependency_path` invariants
    ///
    /// The path must be non-empty, end with this consent's id, and must not
    /// name any consent twice.
    pub fn validate(&self) -> Result<(), ConsentForestError> {
        let invalid = |reason: &str| ConsentForestError::InvalidDependencyPath {
            consent: self.id,
            reason: reason.to_string(),
        };

        match self.dependency_path.last() {
            None => return Err(invalid("path is empty")),
            Some(last) if *last != self.id => {
                return Err(invalid("path does not end with the consent's own id"));
            }
            Some(_) => {}
        }

        let mut seen = HashSet::with_capacity(self.dependency_path.len());
        if !self.dependency_path.iter().all(|id| seen.insert(*id)) {
            return Err(invalid("path repeats a consent id"));
        }

        Ok(())
    }

    /// Root of the tree this consent belongs to
    pub fn root_id(&self) -> Option<ConsentId> {
        self.dependency_path.first().copied()
    }

    /// Immediate parent, `None` for roots
    pub fn parent_id(&self) -> Option<ConsentId> {
        let len = self.dependency_path.len();
        if len < 2 {
            None
        } else {
            Some(self.dependency_path[len - 2])
        }
    }

    pub fn is_root(&self) -> bool {
        self.dependency_path.len() == 1
    }

    /// Depth within its tree, roots are 1
    pub fn depth(&self) -> usize {
        self.dependency_path.len()
    }
}

impl fmt::Display for ConsentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id={}, client={})",
            self.scope_value, self.id, self.client
        )
    }
}

/// Body of a "list consents" response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentList {
    #[serde(default)]
    pub consents: Vec<ConsentRecord>,
}

impl ConsentList {
    /// Parse a consent-list response body
    pub fn from_json(body: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

impl IntoIterator for ConsentList {
    type Item = ConsentRecord;
    type IntoIter = std::vec::IntoIter<ConsentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.consents.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        let root = ConsentRecord::new(1, "client-a", "transfer", [1]);
        assert!(root.is_root());
        assert_eq!(root.parent_id(), None);
        assert_eq!(root.root_id(), Some(ConsentId(1)));
        assert_eq!(root.depth(), 1);

        let child = ConsentRecord::new(3, "client-b", "data_access", [1, 2, 3]);
        assert!(!child.is_root());
        assert_eq!(child.parent_id(), Some(ConsentId(2)));
        assert_eq!(child.root_id(), Some(ConsentId(1)));
        assert_eq!(child.depth(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(ConsentRecord::new(1, "c", "s", [1]).validate().is_ok());
        assert!(ConsentRecord::new(2, "c", "s", [1, 2]).validate().is_ok());

        let empty = ConsentRecord::new(1, "c", "s", []);
        assert!(matches!(
            empty.validate(),
            Err(ConsentForestError::InvalidDependencyPath { .. })
        ));

        let wrong_tail = ConsentRecord::new(2, "c", "s", [2, 1]);
        assert!(wrong_tail.validate().is_err());

        let repeated = ConsentRecord::new(1, "c", "s", [1, 2, 1]);
        assert!(repeated.validate().is_err());
    }

    #[test]
    fn test_deserialize_service_payload() {
        let body = r#"{
            "consents": [
                {
                    "id": 101,
                    "client": "9b6f1bd8-0000-4000-8000-000000000001",
                    "scope": "a1b2c3",
                    "scope_name": "urn:example:scopes:transfer:all",
                    "effective_identity": "user-1",
                    "dependency_path": [101],
                    "status": "approved",
                    "atomically_revocable": false,
                    "allows_refresh": true,
                    "auto_approved": false,
                    "created": "2024-01-02T03:04:05.000000+00:00",
                    "updated": "2024-01-02T03:04:05.000000+00:00",
                    "last_used": null
                },
                {
                    "id": 102,
                    "client": "9b6f1bd8-0000-4000-8000-000000000002",
                    "scope_name": "https://auth.example.org/scopes/data_access",
                    "dependency_path": [101, 102]
                }
            ]
        }"#;

        let list = ConsentList::from_json(body).unwrap();
        assert_eq!(list.consents.len(), 2);

        let root = &list.consents[0];
        assert_eq!(root.id, ConsentId(101));
        assert_eq!(root.scope_value, "urn:example:scopes:transfer:all");
        assert_eq!(root.status.as_deref(), Some("approved"));
        assert!(root.allows_refresh);
        assert!(root.last_used.is_none());

        let child = &list.consents[1];
        assert_eq!(child.parent_id(), Some(ConsentId(101)));
        assert!(!child.atomically_revocable);
        assert!(child.scope.is_none());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let record = ConsentRecord::new(5, "client", "foo", [5]).with_status("approved");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["scope_name"], "foo");
        assert_eq!(value["id"], 5);
        assert_eq!(value["dependency_path"], serde_json::json!([5]));
    }

    #[test]
    fn test_display() {
        let record = ConsentRecord::new(7, "client-x", "foo", [7]);
        assert_eq!(record.to_string(), "foo (id=7, client=client-x)");
    }

    #[test]
    fn test_from_json_reports_malformed_body() {
        let err = ConsentList::from_json(r#"{"consents": [{"id": "seven"}]}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
