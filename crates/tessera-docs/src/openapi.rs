//! OpenAPI document types.
//!
//! A deliberately small subset of OpenAPI 3.0: what can be derived from a
//! binding plan and nothing more.

use crate::error::DocsResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tessera_core::schema::Definitions;
use tessera_core::Schema;

/// OpenAPI document root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version.
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Paths in registration order.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components.
    #[serde(default)]
    pub components: Components,
}

impl OpenApi {
    /// Serializes the document as a JSON value.
    pub fn to_value(&self) -> DocsResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> DocsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// API metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
}

/// The operations available on a single path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Returns the slot for `method`, or `None` for an extension method.
    pub fn slot_mut(&mut self, method: &http::Method) -> Option<&mut Option<Operation>> {
        let slot = match *method {
            http::Method::GET => &mut self.get,
            http::Method::PUT => &mut self.put,
            http::Method::POST => &mut self.post,
            http::Method::DELETE => &mut self.delete,
            http::Method::OPTIONS => &mut self.options,
            http::Method::HEAD => &mut self.head,
            http::Method::PATCH => &mut self.patch,
            http::Method::TRACE => &mut self.trace,
            _ => return None,
        };
        Some(slot)
    }

    /// Returns the operation registered for `method`.
    #[must_use]
    pub fn operation(&self, method: &http::Method) -> Option<&Operation> {
        match *method {
            http::Method::GET => self.get.as_ref(),
            http::Method::PUT => self.put.as_ref(),
            http::Method::POST => self.post.as_ref(),
            http::Method::DELETE => self.delete.as_ref(),
            http::Method::OPTIONS => self.options.as_ref(),
            http::Method::HEAD => self.head.as_ref(),
            http::Method::PATCH => self.patch.as_ref(),
            http::Method::TRACE => self.trace.as_ref(),
            _ => None,
        }
    }
}

/// An API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Short summary.
    pub summary: String,
    /// Unique operation identifier.
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code.
    pub responses: IndexMap<String, Response>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
}

/// An operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Whether required.
    pub required: bool,
    /// Parameter schema.
    pub schema: Schema,
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether required.
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    pub schema: Schema,
}

/// Response definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Description (required).
    pub description: String,
}

/// Reusable components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Reusable schemas.
    #[serde(default)]
    pub schemas: Definitions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameter_serialization() {
        let param = Parameter {
            name: "id".to_string(),
            location: ParameterIn::Path,
            required: true,
            schema: Schema::integer(),
        };
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } })
        );
    }

    #[test]
    fn test_path_item_slots() {
        let mut item = PathItem::default();
        let op = Operation {
            summary: "Ping".to_string(),
            operation_id: "ping".to_string(),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
        };
        *item.slot_mut(&http::Method::GET).unwrap() = Some(op);

        assert!(item.operation(&http::Method::GET).is_some());
        assert!(item.operation(&http::Method::POST).is_none());
        let ext = http::Method::from_bytes(b"PURGE").unwrap();
        assert!(item.slot_mut(&ext).is_none());

        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("get").is_some());
        assert!(value.get("post").is_none());
    }
}
