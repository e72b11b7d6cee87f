//! Structural schemas for request bodies.
//!
//! A body type describes itself through [`JsonSchema`]. Types that return a
//! [`schema_name`](JsonSchema::schema_name) are emitted once under
//! `#/components/schemas/<name>` and referenced from every use site; unnamed
//! types are inlined.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::schema::{schema_for, Definitions, JsonSchema, Schema};
//!
//! struct Item;
//!
//! impl JsonSchema for Item {
//!     fn schema_name() -> Option<&'static str> {
//!         Some("Item")
//!     }
//!
//!     fn schema() -> Schema {
//!         Schema::object()
//!             .required_property("name", Schema::string())
//!             .required_property("price", Schema::number())
//!     }
//! }
//!
//! let mut defs = Definitions::new();
//! let schema = schema_for::<Item>(&mut defs);
//! assert_eq!(schema.reference.as_deref(), Some("#/components/schemas/Item"));
//! assert!(defs.contains_key("Item"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of component references.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Named schema definitions, in first-registration order.
pub type Definitions = IndexMap<String, Schema>;

/// JSON schema type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String.
    String,
    /// Number.
    Number,
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Array.
    Array,
    /// Object.
    Object,
}

/// A (subset of a) JSON schema object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Schema type.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Format hint (e.g. "int64", "double").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to a component.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "$ref")]
    pub reference: Option<String>,
    /// Object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required property names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether `null` is accepted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Schema {
    fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Default::default()
        }
    }

    /// A string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::typed(SchemaType::String)
    }

    /// An integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::typed(SchemaType::Integer)
    }

    /// A number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::typed(SchemaType::Number)
    }

    /// A boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::typed(SchemaType::Boolean)
    }

    /// An array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed(SchemaType::Array)
        }
    }

    /// An object schema with no properties.
    #[must_use]
    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    /// A reference to a named component.
    #[must_use]
    pub fn component(name: &str) -> Self {
        Self {
            reference: Some(format!("{COMPONENTS_PREFIX}{name}")),
            ..Default::default()
        }
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restricts the schema to the given values.
    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        self.enum_values = values.into_iter().collect();
        self
    }

    /// Marks the schema nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds an optional property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Adds a required property.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }
}

/// Types that describe their JSON shape.
pub trait JsonSchema {
    /// The type's own schema.
    fn schema() -> Schema;

    /// Component name. Named types are referenced rather than inlined.
    fn schema_name() -> Option<&'static str> {
        None
    }

    /// Registers the named schemas this type refers to.
    ///
    /// Implement this when [`schema`](Self::schema) references other named
    /// types with [`Schema::component`]; call [`register`] for each of them.
    fn definitions(_defs: &mut Definitions) {}
}

/// Returns the schema to embed where `T` is used, registering `T` and the
/// types it references into `defs`.
pub fn schema_for<T: JsonSchema + ?Sized>(defs: &mut Definitions) -> Schema {
    T::definitions(defs);
    match T::schema_name() {
        Some(name) => {
            defs.insert(name.to_string(), T::schema());
            Schema::component(name)
        }
        None => T::schema(),
    }
}

/// Registers `T` (if named) and everything it references.
pub fn register<T: JsonSchema + ?Sized>(defs: &mut Definitions) {
    let _ = schema_for::<T>(defs);
}

fn use_site<T: JsonSchema + ?Sized>() -> Schema {
    T::schema_name().map_or_else(T::schema, Schema::component)
}

macro_rules! integer_schema {
    ($($ty:ty => $format:literal),* $(,)?) => {
        $(
            impl JsonSchema for $ty {
                fn schema() -> Schema {
                    Schema::integer().with_format($format)
                }
            }
        )*
    };
}

integer_schema!(
    i8 => "int32", i16 => "int32", i32 => "int32", i64 => "int64",
    u8 => "int32", u16 => "int32", u32 => "int64", u64 => "int64",
    usize => "int64", isize => "int64",
);

impl JsonSchema for f32 {
    fn schema() -> Schema {
        Schema::number().with_format("float")
    }
}

impl JsonSchema for f64 {
    fn schema() -> Schema {
        Schema::number().with_format("double")
    }
}

impl JsonSchema for bool {
    fn schema() -> Schema {
        Schema::boolean()
    }
}

impl JsonSchema for String {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl JsonSchema for str {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl JsonSchema for serde_json::Value {
    fn schema() -> Schema {
        Schema::default()
    }
}

impl<T: JsonSchema> JsonSchema for Option<T> {
    fn schema() -> Schema {
        use_site::<T>().nullable()
    }

    fn definitions(defs: &mut Definitions) {
        register::<T>(defs);
    }
}

impl<T: JsonSchema> JsonSchema for Vec<T> {
    fn schema() -> Schema {
        Schema::array(use_site::<T>())
    }

    fn definitions(defs: &mut Definitions) {
        register::<T>(defs);
    }
}

impl<T: JsonSchema + ?Sized> JsonSchema for Box<T> {
    fn schema() -> Schema {
        T::schema()
    }

    fn schema_name() -> Option<&'static str> {
        T::schema_name()
    }

    fn definitions(defs: &mut Definitions) {
        T::definitions(defs);
    }
}
