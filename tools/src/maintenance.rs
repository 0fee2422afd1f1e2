//! Maintenance request tools.
//!
//! Two tools make up the copilot's surface: one drafts a structured request
//! from what the guest said, the other persists it. Only the second has an
//! external effect.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ToolError};
use crate::registry::ToolRegistry;
use crate::spec::{DataType, InputConstraints, ToolInput, ToolSpec};
use crate::storage::RequestStore;
use crate::tool::{ToolDescriptor, ToolHandler};

/// Source recorded for requests filed through the copilot.
pub const COPILOT_SOURCE: &str = "customer";

/// Name of the drafting tool.
pub const CREATE_REQUEST_TOOL: &str = "create_maintenance_request";

/// Name of the persisting tool.
pub const SAVE_REQUEST_TOOL: &str = "save_maintenance_request";

/// A maintenance request for a hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    /// Unique identifier.
    pub id: Uuid,

    /// Hotel the request is for.
    pub hotel_id: i64,

    /// Hotel name.
    pub hotel: String,

    /// Description of the problem.
    pub details: String,

    /// Room number, when the problem is in a room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<i64>,

    /// Location on the property, when not a room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Who raised the request.
    pub source: String,

    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRequest {
    /// Create a new request with a fresh id.
    pub fn new(hotel_id: i64, hotel: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            hotel: hotel.into(),
            details: details.into(),
            room_number: None,
            location: None,
            source: COPILOT_SOURCE.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Set the room number.
    pub fn with_room_number(mut self, room_number: i64) -> Self {
        self.room_number = Some(room_number);
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Arguments the model supplies for either tool.
#[derive(Debug, Deserialize)]
struct RequestArguments {
    #[serde(default)]
    id: Option<Uuid>,
    hotel_id: i64,
    hotel: String,
    details: String,
    #[serde(default)]
    room_number: Option<i64>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl RequestArguments {
    fn parse(arguments: serde_json::Value) -> Result<Self> {
        serde_json::from_value(arguments).map_err(|e| ToolError::InvalidInput(e.to_string()))
    }

    fn into_request(self) -> MaintenanceRequest {
        let mut request = MaintenanceRequest::new(self.hotel_id, self.hotel, self.details);
        if let Some(id) = self.id {
            request.id = id;
        }
        request.room_number = self.room_number;
        request.location = self.location.filter(|l| !l.trim().is_empty());
        if let Some(source) = self.source.filter(|s| !s.trim().is_empty()) {
            request.source = source;
        }
        request
    }
}

fn request_fields() -> ToolSpec {
    ToolSpec::new()
        .with_input(
            ToolInput::required("hotel_id", DataType::Integer, "The ID of the hotel")
                .with_constraints(InputConstraints::at_least(1.0)),
        )
        .with_input(
            ToolInput::required("hotel", DataType::String, "The name of the hotel")
                .with_constraints(InputConstraints::length(1, 200)),
        )
        .with_input(
            ToolInput::required(
                "details",
                DataType::String,
                "A description of the problem that needs attention",
            )
            .with_constraints(InputConstraints::length(1, 2000)),
        )
        .with_input(ToolInput::optional(
            "room_number",
            DataType::Integer,
            "The room number, if the problem is in a guest room",
        ))
        .with_input(ToolInput::optional(
            "location",
            DataType::String,
            "Where on the property the problem is, if not in a guest room",
        ))
}

/// Drafts a maintenance request without saving it.
#[derive(Debug, Default)]
pub struct CreateMaintenanceRequestTool;

#[async_trait]
impl ToolHandler for CreateMaintenanceRequestTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            CREATE_REQUEST_TOOL,
            "Creates a new maintenance request for a hotel. The request is not saved; \
             show it to the user and ask for approval before saving it.",
        )
        .with_spec(request_fields())
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let request = RequestArguments::parse(arguments)?.into_request();
        Ok(serde_json::to_value(request)?)
    }
}

/// Persists a maintenance request to the request store.
pub struct SaveMaintenanceRequestTool {
    store: Arc<dyn RequestStore>,
}

impl SaveMaintenanceRequestTool {
    /// Create the tool over a request store.
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for SaveMaintenanceRequestTool {
    fn descriptor(&self) -> ToolDescriptor {
        let spec = request_fields()
            .with_input(ToolInput::optional(
                "id",
                DataType::String,
                "The id of the request returned by create_maintenance_request",
            ))
            .with_input(ToolInput::optional(
                "source",
                DataType::String,
                "Who raised the request",
            ));

        ToolDescriptor::new(
            SAVE_REQUEST_TOOL,
            "Saves a maintenance request to the database so hotel maintenance is notified. \
             Only call this after the user has approved the request.",
        )
        .with_spec(spec)
        .consequential()
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let request = RequestArguments::parse(arguments)?.into_request();

        self.store.save(&request).await?;
        info!(
            "Saved maintenance request {} for hotel {}",
            request.id, request.hotel_id
        );

        Ok(serde_json::json!({
            "status": "saved",
            "request_id": request.id,
            "message": "Hotel maintenance has been notified."
        }))
    }
}

/// Register the maintenance tools into `registry`.
pub fn register_maintenance_tools(
    registry: &mut ToolRegistry,
    store: Arc<dyn RequestStore>,
) -> Result<()> {
    registry.register(Arc::new(CreateMaintenanceRequestTool))?;
    registry.register(Arc::new(SaveMaintenanceRequestTool::new(store)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryRequestStore;
    use crate::tool::ToolEffect;
    use pretty_assertions::assert_eq;

    fn leak_arguments() -> serde_json::Value {
        serde_json::json!({
            "hotel_id": 3,
            "hotel": "Oceanview Inn",
            "details": "Water leaking from the bathroom ceiling",
            "room_number": 204
        })
    }

    #[tokio::test]
    async fn test_create_does_not_persist() {
        let store = Arc::new(InMemoryRequestStore::new());
        let mut registry = ToolRegistry::new();
        register_maintenance_tools(&mut registry, store.clone()).unwrap();

        let result = registry
            .invoke(CREATE_REQUEST_TOOL, leak_arguments(), None)
            .await;

        assert!(result.success);
        assert_eq!(result.output["room_number"], 204);
        assert_eq!(result.output["source"], COPILOT_SOURCE);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_persists_with_given_id() {
        let store = Arc::new(InMemoryRequestStore::new());
        let tool = SaveMaintenanceRequestTool::new(store.clone());
        let id = Uuid::new_v4();

        let mut arguments = leak_arguments();
        arguments["id"] = serde_json::json!(id.to_string());
        let output = tool.call(arguments.clone()).await.unwrap();
        tool.call(arguments).await.unwrap();

        assert_eq!(output["status"], "saved");
        let saved = store.list().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].hotel, "Oceanview Inn");
    }

    #[tokio::test]
    async fn test_save_rejects_missing_details() {
        let store = Arc::new(InMemoryRequestStore::new());
        let mut registry = ToolRegistry::new();
        register_maintenance_tools(&mut registry, store.clone()).unwrap();

        let result = registry
            .invoke(
                SAVE_REQUEST_TOOL,
                serde_json::json!({ "hotel_id": 3, "hotel": "Oceanview Inn" }),
                None,
            )
            .await;

        assert!(!result.success);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_only_save_is_consequential() {
        let store = Arc::new(InMemoryRequestStore::new());
        assert_eq!(
            CreateMaintenanceRequestTool.descriptor().effect,
            ToolEffect::ReadOnly
        );
        assert_eq!(
            SaveMaintenanceRequestTool::new(store).descriptor().effect,
            ToolEffect::Consequential
        );
    }
}
