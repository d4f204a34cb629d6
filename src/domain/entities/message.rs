use super::{EntityType, ProcessorCommand};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::application::errors::ConstructionError;

/// Payload key holding the entity type name
pub const CLASS_NAME_KEY: &str = "className";
/// Payload key holding the entity instance
pub const MODEL_KEY: &str = "model";
/// Payload key holding the command
pub const COMMAND_KEY: &str = "command";

/// Message sent to the processor destination once a transaction commits.
///
/// Fields are private: a message cannot change after construction. The model
/// is captured as a JSON value so the message owns everything it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchMessage {
    id: Uuid,
    entity_type: EntityType,
    model: serde_json::Value,
    command: ProcessorCommand,
    created_at: DateTime<Utc>,
}

impl DispatchMessage {
    pub fn new<M: Serialize + ?Sized>(
        entity_type: EntityType,
        model: &M,
        command: ProcessorCommand,
    ) -> Result<Self, ConstructionError> {
        let model = serde_json::to_value(model)?;

        Ok(Self {
            id: Uuid::new_v4(),
            entity_type,
            model,
            command,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn model(&self) -> &serde_json::Value {
        &self.model
    }

    pub fn command(&self) -> ProcessorCommand {
        self.command
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Decode the model back into a concrete type
    pub fn model_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.model.clone())
    }

    /// Render the message as the key/value mapping listeners receive
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            CLASS_NAME_KEY: self.entity_type.name(),
            MODEL_KEY: self.model,
            COMMAND_KEY: self.command,
            "createdAt": self.created_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;

    #[derive(Serialize)]
    struct Image {
        id: u64,
        file_name: String,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("no stable reference"))
        }
    }

    #[test]
    fn test_payload_has_class_name_model_and_command() {
        let entity_type = EntityType::new("media.Image").unwrap();
        let image = Image { id: 7, file_name: "cat.png".to_string() };
        let message = DispatchMessage::new(entity_type, &image, ProcessorCommand::Process).unwrap();

        let payload = message.to_payload();
        assert_eq!(payload[CLASS_NAME_KEY], "media.Image");
        assert_eq!(payload[MODEL_KEY]["id"], 7);
        assert_eq!(payload[MODEL_KEY]["file_name"], "cat.png");
        assert_eq!(payload[COMMAND_KEY], "PROCESS");
        assert_eq!(payload["id"], message.id().to_string());
    }

    #[test]
    fn test_unserializable_model_is_construction_error() {
        let entity_type = EntityType::new("media.Image").unwrap();
        let result = DispatchMessage::new(entity_type, &Unserializable, ProcessorCommand::CleanUp);

        match result {
            Err(ConstructionError::Serialization(msg)) => assert!(msg.contains("no stable reference")),
            other => panic!("expected serialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_messages_get_distinct_ids() {
        let entity_type = EntityType::new("media.Image").unwrap();
        let a = DispatchMessage::new(entity_type.clone(), &1, ProcessorCommand::Process).unwrap();
        let b = DispatchMessage::new(entity_type, &1, ProcessorCommand::Process).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
