use std::fmt;
use serde::Serialize;
use crate::application::errors::ConstructionError;

/// Name of the kind of domain object a processor works on, e.g. an image attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Result<Self, ConstructionError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConstructionError::InvalidEntityType(name));
        }
        Ok(Self(name))
    }

    /// Entity type of a model type
    pub fn of<M: MediaModel + ?Sized>() -> Result<Self, ConstructionError> {
        Self::new(M::entity_type_name())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A model whose media can be processed.
///
/// The entity type name defaults to the fully qualified Rust type name. Models
/// shared with other systems should override it with a stable name.
pub trait MediaModel: Serialize + Send + Sync {
    fn entity_type_name() -> String {
        std::any::type_name::<Self>().to_string()
    }
}
