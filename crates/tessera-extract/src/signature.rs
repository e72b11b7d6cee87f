//! Declarative handler signatures.
//!
//! A [`Signature`] lists a handler's parameters in declaration order. Each
//! [`Param`] carries a name, an optional [`Annotation`] describing its type,
//! and an optional [`ParamDefault`]. The classifier turns the signature into
//! a [`BindingPlan`](crate::BindingPlan) once, at registration.
//!
//! ```rust
//! use serde::Deserialize;
//! use tessera_core::schema::{JsonSchema, Schema};
//! use tessera_core::Dependency;
//! use tessera_extract::{Param, Signature};
//!
//! #[derive(Deserialize)]
//! struct Item {
//!     name: String,
//! }
//!
//! impl JsonSchema for Item {
//!     fn schema_name() -> Option<&'static str> {
//!         Some("Item")
//!     }
//!     fn schema() -> Schema {
//!         Schema::object().required_property("name", Schema::string())
//!     }
//! }
//!
//! let signature = Signature::new("update_item")
//!     .param(Param::request())
//!     .param(Param::typed::<i64>("item_id"))
//!     .param(Param::typed::<bool>("notify").with_default(false))
//!     .param(Param::body::<Item>("item"))
//!     .param(Param::depends("db", Dependency::sync(|| Ok(42_u32))))
//!     .param(Param::background_tasks("tasks"));
//!
//! assert_eq!(signature.params().len(), 6);
//! ```

use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use tessera_core::schema::{schema_for, Definitions, JsonSchema, Schema};
use tessera_core::{Dependency, Scalar, ScalarType, ScalarValue};

/// Name that marks the raw request parameter.
pub const REQUEST_PARAM: &str = "request";

/// A decoded request body.
pub type BodyValue = Box<dyn Any + Send + Sync>;

/// A structured body type: how to decode it and how to describe it.
#[derive(Clone, Copy)]
pub struct BodyType {
    type_name: &'static str,
    decode: fn(&[u8]) -> Result<BodyValue, serde_json::Error>,
    schema: fn(&mut Definitions) -> Schema,
}

impl BodyType {
    /// Describes `T`.
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + JsonSchema + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_json::<T>,
            schema: schema_for::<T>,
        }
    }

    /// Returns the Rust type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decodes a JSON payload.
    pub fn decode(&self, bytes: &[u8]) -> Result<BodyValue, serde_json::Error> {
        (self.decode)(bytes)
    }

    /// Returns the use-site schema, registering named definitions into `defs`.
    pub fn schema(&self, defs: &mut Definitions) -> Schema {
        (self.schema)(defs)
    }
}

impl fmt::Debug for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodyType").field(&self.type_name).finish()
    }
}

fn decode_json<T>(bytes: &[u8]) -> Result<BodyValue, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    serde_json::from_slice::<T>(bytes).map(|value| Box::new(value) as BodyValue)
}

/// A parameter's declared type.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// One of the four scalar types.
    Scalar(ScalarType),
    /// A structured request body.
    Body(BodyType),
    /// The background task collector.
    BackgroundTasks,
    /// Any other type. Never bound.
    Opaque(&'static str),
}

/// A parameter's default.
#[derive(Debug, Clone)]
pub enum ParamDefault {
    /// A concrete scalar default.
    Value(ScalarValue),
    /// Defaults to nothing; the parameter is optional.
    Null,
    /// The parameter is produced by a dependency.
    Depends(Dependency),
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    annotation: Option<Annotation>,
    default: Option<ParamDefault>,
}

impl Param {
    /// An unannotated parameter with no default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    /// The raw request.
    #[must_use]
    pub fn request() -> Self {
        Self::new(REQUEST_PARAM)
    }

    /// A parameter typed as `T`.
    #[must_use]
    pub fn typed<T: Scalar>(name: impl Into<String>) -> Self {
        Self::scalar(name, T::TYPE)
    }

    /// A parameter with an explicit scalar type.
    #[must_use]
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::new(name).annotated(Annotation::Scalar(ty))
    }

    /// A structured body decoded into `T`.
    #[must_use]
    pub fn body<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + JsonSchema + Send + Sync + 'static,
    {
        Self::new(name).annotated(Annotation::Body(BodyType::of::<T>()))
    }

    /// The background task collector.
    #[must_use]
    pub fn background_tasks(name: impl Into<String>) -> Self {
        Self::new(name).annotated(Annotation::BackgroundTasks)
    }

    /// A parameter produced by `dependency`.
    #[must_use]
    pub fn depends(name: impl Into<String>, dependency: Dependency) -> Self {
        Self {
            default: Some(ParamDefault::Depends(dependency)),
            ..Self::new(name)
        }
    }

    /// A parameter of a type the binder does not understand.
    #[must_use]
    pub fn opaque(name: impl Into<String>, type_name: &'static str) -> Self {
        Self::new(name).annotated(Annotation::Opaque(type_name))
    }

    /// Sets the annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Sets a scalar default, making the parameter optional.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<ScalarValue>) -> Self {
        self.default = Some(ParamDefault::Value(value.into()));
        self
    }

    /// Makes the parameter optional with no value.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.default = Some(ParamDefault::Null);
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the annotation.
    #[must_use]
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    /// Returns the default.
    #[must_use]
    pub fn default(&self) -> Option<&ParamDefault> {
        self.default.as_ref()
    }
}

/// A handler's name and parameters.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
}

impl Signature {
    /// Starts a signature for the handler called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Returns the handler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl JsonSchema for Point {
        fn schema() -> Schema {
            Schema::object()
                .required_property("x", Schema::integer())
                .required_property("y", Schema::integer())
        }
    }

    #[test]
    fn test_body_type_decodes() {
        let ty = BodyType::of::<Point>();
        let value = ty.decode(br#"{"x":1,"y":2}"#).unwrap();
        assert_eq!(*value.downcast::<Point>().unwrap(), Point { x: 1, y: 2 });
        assert!(ty.decode(b"{").is_err());
        assert!(ty.type_name().ends_with("Point"));
    }

    #[test]
    fn test_body_type_schema_is_inlined_when_unnamed() {
        let mut defs = Definitions::new();
        let schema = BodyType::of::<Point>().schema(&mut defs);
        assert!(defs.is_empty());
        assert_eq!(schema.required, vec!["x", "y"]);
    }

    #[test]
    fn test_param_builders() {
        let param = Param::typed::<i64>("limit").with_default(10);
        assert!(matches!(
            param.annotation(),
            Some(Annotation::Scalar(ScalarType::Integer))
        ));
        assert!(matches!(
            param.default(),
            Some(ParamDefault::Value(ScalarValue::Integer(10)))
        ));

        let param = Param::typed::<String>("q").optional();
        assert!(matches!(param.default(), Some(ParamDefault::Null)));

        assert_eq!(Param::request().name(), REQUEST_PARAM);
        assert!(Param::new("anything").annotation().is_none());
    }
}
