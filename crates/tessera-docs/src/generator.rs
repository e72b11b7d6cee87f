//! Builds an [`OpenApi`] document from registered binding plans.

use crate::openapi::{
    Components, Info, MediaType, OpenApi, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, Response,
};
use indexmap::IndexMap;
use tessera_core::schema::Definitions;
use tessera_core::{ConfigurationError, ScalarType, Schema};
use tessera_extract::BindingPlan;
use tracing::{debug, warn};

/// Default OpenAPI version emitted at the top of the document.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

/// One registered route as seen by the generator.
#[derive(Debug, Clone, Copy)]
pub struct RouteDoc<'a> {
    /// HTTP method.
    pub method: &'a http::Method,
    /// Path template as registered.
    pub path: &'a str,
    /// The route's plan. Routes without one are left out of the document.
    pub plan: Option<&'a BindingPlan>,
}

/// Generator for OpenAPI documents.
///
/// # Example
///
/// ```rust
/// use tessera_core::PathTemplate;
/// use tessera_docs::{OpenApiGenerator, RouteDoc};
/// use tessera_extract::{BindingPlan, CompileOptions, Param, Signature};
///
/// let template = PathTemplate::parse("/items/{id}").unwrap();
/// let signature = Signature::new("read_item").param(Param::typed::<i64>("id"));
/// let plan = BindingPlan::compile(&signature, &template, &CompileOptions::default()).unwrap();
///
/// let doc = OpenApiGenerator::new()
///     .title("Inventory")
///     .generate([RouteDoc {
///         method: &http::Method::GET,
///         path: "/items/{id}",
///         plan: Some(&plan),
///     }])
///     .unwrap();
///
/// let op = doc.paths["/items/{id}"].get.as_ref().unwrap();
/// assert_eq!(op.summary, "Read Item");
/// ```
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    title: String,
    version: String,
    openapi_version: String,
    strict_schema_names: bool,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "Tessera".to_string(),
            version: "1.0.0".to_string(),
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
            strict_schema_names: false,
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the `openapi` field.
    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    /// Reject two routes that define the same component name differently.
    #[must_use]
    pub fn strict_schema_names(mut self, strict: bool) -> Self {
        self.strict_schema_names = strict;
        self
    }

    /// Whether schema conflicts are errors.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict_schema_names
    }

    /// Generate the document.
    ///
    /// Paths appear in the order the routes are given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::SchemaConflict`] when strict schema
    /// names are enabled and two routes disagree on a component.
    pub fn generate<'a, I>(&self, routes: I) -> Result<OpenApi, ConfigurationError>
    where
        I: IntoIterator<Item = RouteDoc<'a>>,
    {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut schemas = Definitions::new();

        for route in routes {
            let Some(plan) = route.plan else {
                continue;
            };

            let mut defs = Definitions::new();
            let operation = operation(plan, &mut defs);
            self.merge(&mut schemas, defs, plan.display_name())?;

            let item = paths.entry(route.path.to_string()).or_default();
            match item.slot_mut(route.method) {
                Some(slot) => *slot = Some(operation),
                None => warn!(
                    method = %route.method,
                    path = %route.path,
                    "method has no OpenAPI slot, route left undocumented"
                ),
            }
        }

        debug!(
            paths = paths.len(),
            schemas = schemas.len(),
            "generated OpenAPI document"
        );

        Ok(OpenApi {
            openapi: self.openapi_version.clone(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
            },
            paths,
            components: Components { schemas },
        })
    }

    fn merge(
        &self,
        schemas: &mut Definitions,
        defs: Definitions,
        route: &str,
    ) -> Result<(), ConfigurationError> {
        for (name, schema) in defs {
            if let Some(existing) = schemas.get(&name) {
                if *existing != schema {
                    if self.strict_schema_names {
                        return Err(ConfigurationError::SchemaConflict {
                            name,
                            route: route.to_string(),
                        });
                    }
                    warn!(
                        schema = %name,
                        route = %route,
                        "schema component redefined, keeping the latest definition"
                    );
                }
            }
            schemas.insert(name, schema);
        }
        Ok(())
    }
}

fn operation(plan: &BindingPlan, defs: &mut Definitions) -> Operation {
    let mut parameters = Vec::with_capacity(plan.path_params().len() + plan.query_params().len());

    for (name, ty) in plan.path_params() {
        parameters.push(Parameter {
            name: name.clone(),
            location: ParameterIn::Path,
            required: true,
            schema: scalar_schema(*ty),
        });
    }

    for (name, query) in plan.query_params() {
        let mut schema = scalar_schema(query.ty);
        if let Some(default) = &query.default {
            schema = schema.with_default(default.to_json());
        }
        parameters.push(Parameter {
            name: name.clone(),
            location: ParameterIn::Query,
            required: query.required(),
            schema,
        });
    }

    let request_body = plan.body().map(|body| {
        let mut content = IndexMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: body.ty.schema(defs),
            },
        );
        RequestBody {
            required: true,
            content,
        }
    });

    let mut responses = IndexMap::new();
    responses.insert(
        "200".to_string(),
        Response {
            description: "Successful Response".to_string(),
        },
    );

    Operation {
        summary: summary(plan.display_name()),
        operation_id: plan.display_name().to_string(),
        parameters,
        request_body,
        responses,
    }
}

fn scalar_schema(ty: ScalarType) -> Schema {
    match ty {
        ScalarType::Integer => Schema::integer(),
        ScalarType::Float => Schema::number(),
        ScalarType::Boolean => Schema::boolean(),
        ScalarType::String => Schema::string(),
    }
}

/// `read_user_by_id` becomes `Read User By Id`.
///
/// A letter following a non-letter is upper-cased; every other letter is
/// lower-cased.
fn summary(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut after_letter = false;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}
