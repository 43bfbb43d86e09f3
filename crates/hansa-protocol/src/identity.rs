use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    #[default]
    None,
    Connection,
    Guest,
    Bot,
}

/// Who is on the other end of a client. Ids are prefixed `P` (registered
/// player), `G` (guest) or `B` (bot).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub kind: IdentityKind,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let kind = Self::kind_of(&id);
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// Guest identity named after its numeric suffix ("G5" is "Guest5").
    pub fn guest(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = format!("Guest{}", id.trim_start_matches('G'));
        Self {
            id,
            name,
            kind: IdentityKind::Guest,
        }
    }

    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: IdentityKind::Bot,
        }
    }

    pub fn kind_of(id: &str) -> IdentityKind {
        match id.chars().next() {
            Some('P') => IdentityKind::Connection,
            Some('G') => IdentityKind::Guest,
            Some('B') => IdentityKind::Bot,
            _ => IdentityKind::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_bot(&self) -> bool {
        self.kind == IdentityKind::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_name() {
        let guest = Identity::guest("G5");
        assert_eq!(guest.name, "Guest5");
        assert_eq!(guest.kind, IdentityKind::Guest);
    }

    #[test]
    fn test_kind_from_prefix() {
        assert_eq!(Identity::new("P12", "Ada").kind, IdentityKind::Connection);
        assert_eq!(Identity::new("B1", "Derek (Bot)").kind, IdentityKind::Bot);
        assert!(Identity::default().is_empty());
    }
}
