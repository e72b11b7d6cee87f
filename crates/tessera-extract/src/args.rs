//! The bound argument set handed to a handler.

use crate::signature::BodyValue;
use indexmap::IndexMap;
use std::any::type_name;
use std::sync::Arc;
use tessera_core::{DependencyValue, Request, Scalar, ScalarValue};
use tessera_tasks::BackgroundTasks;
use thiserror::Error;

/// A single bound value.
pub enum BoundValue {
    /// The raw request.
    Request(Arc<Request>),
    /// A cast path or query value, or a query default.
    Scalar(ScalarValue),
    /// An optional query parameter that was absent with no default.
    Null,
    /// A resolved dependency.
    Dependency(DependencyValue),
    /// The request's background task collector.
    Tasks(BackgroundTasks),
    /// The decoded request body.
    Body(BodyValue),
}

impl std::fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(request) => f.debug_tuple("Request").field(&request.id()).finish(),
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Self::Null => f.write_str("Null"),
            Self::Dependency(_) => f.write_str("Dependency(..)"),
            Self::Tasks(tasks) => f.debug_tuple("Tasks").field(tasks).finish(),
            Self::Body(_) => f.write_str("Body(..)"),
        }
    }
}

/// Reading a bound argument failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// Nothing was bound under this name.
    #[error("argument `{name}` was not bound")]
    Missing {
        /// Parameter name.
        name: String,
    },

    /// The bound value has a different type.
    #[error("argument `{name}` is not a {expected}")]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// The requested Rust type.
        expected: &'static str,
    },

    /// The parameter was optional and absent.
    #[error("argument `{name}` is null")]
    Null {
        /// Parameter name.
        name: String,
    },
}

impl ArgError {
    fn missing(name: &str) -> Self {
        Self::Missing {
            name: name.to_string(),
        }
    }

    fn mismatch<T>(name: &str) -> Self {
        Self::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        }
    }
}

/// Result type for argument access.
pub type ArgResult<T> = Result<T, ArgError>;

/// A fully populated argument set, keyed by parameter name.
///
/// Produced by [`Binder::bind`](crate::Binder::bind) and consumed by the
/// handler. Accessors are typed; a wrong type is reported as
/// [`ArgError::TypeMismatch`] rather than a panic.
///
/// # Example
///
/// ```rust
/// use tessera_extract::BoundArgs;
/// use tessera_core::ScalarValue;
///
/// let mut args = BoundArgs::new();
/// args.insert_scalar("id", ScalarValue::Integer(42));
/// args.insert_null("q");
///
/// assert_eq!(args.get::<i64>("id").unwrap(), 42);
/// assert_eq!(args.get_opt::<String>("q").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct BoundArgs {
    values: IndexMap<String, BoundValue>,
    tasks: Option<BackgroundTasks>,
}

impl BoundArgs {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a raw value.
    pub fn insert(&mut self, name: impl Into<String>, value: BoundValue) {
        if let BoundValue::Tasks(tasks) = &value {
            self.tasks.get_or_insert_with(|| tasks.clone());
        }
        self.values.insert(name.into(), value);
    }

    /// Binds a scalar.
    pub fn insert_scalar(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.insert(name, BoundValue::Scalar(value));
    }

    /// Binds an absent optional parameter.
    pub fn insert_null(&mut self, name: impl Into<String>) {
        self.insert(name, BoundValue::Null);
    }

    /// Returns true if `name` was bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound parameter names in binding order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the raw value bound under `name`.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&BoundValue> {
        self.values.get(name)
    }

    /// The raw request, if the handler asked for it.
    pub fn request(&self) -> ArgResult<Arc<Request>> {
        self.values
            .values()
            .find_map(|value| match value {
                BoundValue::Request(request) => Some(Arc::clone(request)),
                _ => None,
            })
            .ok_or_else(|| ArgError::missing(crate::REQUEST_PARAM))
    }

    /// Reads a scalar parameter.
    pub fn get<T: Scalar>(&self, name: &str) -> ArgResult<T> {
        self.get_opt(name)?.ok_or_else(|| ArgError::Null {
            name: name.to_string(),
        })
    }

    /// Reads an optional scalar parameter; `None` if it was absent.
    pub fn get_opt<T: Scalar>(&self, name: &str) -> ArgResult<Option<T>> {
        match self.values.get(name) {
            Some(BoundValue::Scalar(value)) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| ArgError::mismatch::<T>(name)),
            Some(BoundValue::Null) => Ok(None),
            Some(_) => Err(ArgError::mismatch::<T>(name)),
            None => Err(ArgError::missing(name)),
        }
    }

    /// Reads a resolved dependency.
    pub fn dependency<T: Send + Sync + 'static>(&self, name: &str) -> ArgResult<Arc<T>> {
        match self.values.get(name) {
            Some(BoundValue::Dependency(value)) => Arc::clone(value)
                .downcast::<T>()
                .map_err(|_| ArgError::mismatch::<T>(name)),
            Some(_) => Err(ArgError::mismatch::<T>(name)),
            None => Err(ArgError::missing(name)),
        }
    }

    /// Borrows the decoded body.
    pub fn body<T: 'static>(&self, name: &str) -> ArgResult<&T> {
        match self.values.get(name) {
            Some(BoundValue::Body(value)) => value
                .downcast_ref::<T>()
                .ok_or_else(|| ArgError::mismatch::<T>(name)),
            Some(_) => Err(ArgError::mismatch::<T>(name)),
            None => Err(ArgError::missing(name)),
        }
    }

    /// Moves the decoded body out of the set.
    pub fn take_body<T: 'static>(&mut self, name: &str) -> ArgResult<T> {
        match self.values.get(name) {
            Some(BoundValue::Body(value)) if value.is::<T>() => {}
            Some(_) => return Err(ArgError::mismatch::<T>(name)),
            None => return Err(ArgError::missing(name)),
        }
        match self.values.shift_remove(name) {
            Some(BoundValue::Body(value)) => value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| ArgError::mismatch::<T>(name)),
            _ => Err(ArgError::missing(name)),
        }
    }

    /// The collector bound under `name`.
    pub fn background_tasks(&self, name: &str) -> ArgResult<BackgroundTasks> {
        match self.values.get(name) {
            Some(BoundValue::Tasks(tasks)) => Ok(tasks.clone()),
            Some(_) => Err(ArgError::mismatch::<BackgroundTasks>(name)),
            None => Err(ArgError::missing(name)),
        }
    }

    /// The request's collector, if one was injected.
    ///
    /// Every parameter that asks for a collector shares this one.
    #[must_use]
    pub fn tasks(&self) -> Option<&BackgroundTasks> {
        self.tasks.as_ref()
    }
}
