//! Binding plan compilation.
//!
//! [`BindingPlan::compile`] classifies every parameter of a [`Signature`]
//! against a route's [`PathTemplate`] exactly once, at registration. The
//! resulting plan is immutable and shared read-only by every request.
//!
//! Each parameter is checked against the rules below in order; the first
//! match wins:
//!
//! 1. named `request`: the raw request
//! 2. default is a [`Dependency`]: resolved per request
//! 3. annotated with a body type: the request body (at most one)
//! 4. annotated as [`BackgroundTasks`](tessera_tasks::BackgroundTasks): a fresh collector
//! 5. name is a template placeholder: a path parameter, `string` if unannotated
//! 6. annotated with a scalar type: a query parameter, optional if defaulted
//!
//! Anything else is left unbound.

use crate::signature::{Annotation, BodyType, Param, ParamDefault, Signature, REQUEST_PARAM};
use indexmap::IndexMap;
use tessera_core::{ConfigurationError, Dependency, PathTemplate, ScalarType, ScalarValue};
use tracing::{debug, warn};

/// Options that tighten compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Reject parameters that match no binding rule instead of warning.
    pub strict_signatures: bool,
}

/// A compiled query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    /// Declared scalar type.
    pub ty: ScalarType,
    /// Whether the parameter may be absent.
    pub optional: bool,
    /// The default bound when the parameter is absent, if any.
    pub default: Option<ScalarValue>,
}

impl QueryParam {
    /// Returns true if the parameter must be present.
    #[must_use]
    pub fn required(&self) -> bool {
        !self.optional
    }
}

/// The compiled body parameter.
#[derive(Debug, Clone)]
pub struct BodyParam {
    /// Parameter name.
    pub name: String,
    /// Decoder and schema for the body type.
    pub ty: BodyType,
}

/// The immutable classification of a handler's parameters.
#[derive(Debug, Clone)]
pub struct BindingPlan {
    display_name: String,
    template: PathTemplate,
    path_params: IndexMap<String, ScalarType>,
    query_params: IndexMap<String, QueryParam>,
    body: Option<BodyParam>,
    dependencies: IndexMap<String, Dependency>,
    wants_request: bool,
    background_tasks: Vec<String>,
    unbound: Vec<String>,
}

impl BindingPlan {
    /// Classifies `signature` against `template`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when two parameters share a name,
    /// a second body parameter is declared, a path parameter has a
    /// non-scalar type, a default does not fit its type, the path
    /// parameters do not equal the template placeholders, or (with
    /// `strict_signatures`) a parameter matches no rule.
    pub fn compile(
        signature: &Signature,
        template: &PathTemplate,
        options: &CompileOptions,
    ) -> Result<Self, ConfigurationError> {
        let route = signature.name().to_string();
        let mut plan = Self {
            display_name: route.clone(),
            template: template.clone(),
            path_params: IndexMap::new(),
            query_params: IndexMap::new(),
            body: None,
            dependencies: IndexMap::new(),
            wants_request: false,
            background_tasks: Vec::new(),
            unbound: Vec::new(),
        };

        let mut seen = Vec::with_capacity(signature.params().len());
        for param in signature.params() {
            if seen.contains(&param.name()) {
                return Err(ConfigurationError::DuplicateParameter {
                    route,
                    param: param.name().to_string(),
                });
            }
            seen.push(param.name());
            plan.classify(param, options)?;
        }

        plan.check_path_params()?;

        debug!(
            route = %plan.display_name,
            template = %plan.template,
            path_params = plan.path_params.len(),
            query_params = plan.query_params.len(),
            dependencies = plan.dependencies.len(),
            has_body = plan.body.is_some(),
            "compiled binding plan"
        );
        Ok(plan)
    }

    fn classify(&mut self, param: &Param, options: &CompileOptions) -> Result<(), ConfigurationError> {
        let name = param.name();

        if name == REQUEST_PARAM {
            self.wants_request = true;
            return Ok(());
        }

        if let Some(ParamDefault::Depends(dependency)) = param.default() {
            self.dependencies.insert(name.to_string(), dependency.clone());
            return Ok(());
        }

        match param.annotation() {
            Some(Annotation::Body(ty)) => {
                if let Some(first) = &self.body {
                    return Err(ConfigurationError::DuplicateBody {
                        route: self.display_name.clone(),
                        first: first.name.clone(),
                        second: name.to_string(),
                    });
                }
                self.body = Some(BodyParam {
                    name: name.to_string(),
                    ty: *ty,
                });
                return Ok(());
            }
            Some(Annotation::BackgroundTasks) => {
                self.background_tasks.push(name.to_string());
                return Ok(());
            }
            _ => {}
        }

        if self.template.has_placeholder(name) {
            let ty = match param.annotation() {
                None => ScalarType::String,
                Some(Annotation::Scalar(ty)) => *ty,
                Some(_) => {
                    return Err(ConfigurationError::UnsupportedPathType {
                        route: self.display_name.clone(),
                        param: name.to_string(),
                    })
                }
            };
            self.path_params.insert(name.to_string(), ty);
            return Ok(());
        }

        if let Some(Annotation::Scalar(ty)) = param.annotation() {
            let query = self.query_param(name, *ty, param.default())?;
            self.query_params.insert(name.to_string(), query);
            return Ok(());
        }

        if options.strict_signatures {
            return Err(ConfigurationError::UnboundParameter {
                route: self.display_name.clone(),
                param: name.to_string(),
            });
        }
        warn!(
            route = %self.display_name,
            param = %name,
            "parameter matches no binding rule and will never be populated"
        );
        self.unbound.push(name.to_string());
        Ok(())
    }

    fn query_param(
        &self,
        name: &str,
        ty: ScalarType,
        default: Option<&ParamDefault>,
    ) -> Result<QueryParam, ConfigurationError> {
        let default = match default {
            None => {
                return Ok(QueryParam {
                    ty,
                    optional: false,
                    default: None,
                })
            }
            Some(ParamDefault::Value(value)) => Some(value.clone().coerce(ty).ok_or_else(|| {
                ConfigurationError::InvalidDefault {
                    route: self.display_name.clone(),
                    param: name.to_string(),
                    expected: ty.to_string(),
                }
            })?),
            Some(_) => None,
        };
        Ok(QueryParam {
            ty,
            optional: true,
            default,
        })
    }

    fn check_path_params(&self) -> Result<(), ConfigurationError> {
        let placeholders = self.template.placeholders();
        let missing: Vec<String> = placeholders
            .iter()
            .filter(|p| !self.path_params.contains_key(p.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = self
            .path_params
            .keys()
            .filter(|p| !placeholders.contains(*p))
            .cloned()
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::PathParamMismatch {
                route: self.display_name.clone(),
                missing,
                unexpected,
            })
        }
    }

    /// Handler name, used for documentation.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The route template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Path parameters in declaration order.
    #[must_use]
    pub fn path_params(&self) -> &IndexMap<String, ScalarType> {
        &self.path_params
    }

    /// Query parameters in declaration order.
    #[must_use]
    pub fn query_params(&self) -> &IndexMap<String, QueryParam> {
        &self.query_params
    }

    /// The body parameter, if any.
    #[must_use]
    pub fn body(&self) -> Option<&BodyParam> {
        self.body.as_ref()
    }

    /// Dependencies in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &IndexMap<String, Dependency> {
        &self.dependencies
    }

    /// Whether the handler receives the raw request.
    #[must_use]
    pub fn wants_request(&self) -> bool {
        self.wants_request
    }

    /// Whether a background task collector is injected.
    #[must_use]
    pub fn wants_background_tasks(&self) -> bool {
        !self.background_tasks.is_empty()
    }

    /// Parameter names that receive the background task collector.
    #[must_use]
    pub fn background_task_params(&self) -> &[String] {
        &self.background_tasks
    }

    /// Parameters that matched no rule.
    #[must_use]
    pub fn unbound(&self) -> &[String] {
        &self.unbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tessera_core::schema::{JsonSchema, Schema};
    use tessera_core::DependencyKind;

    #[derive(Deserialize)]
    struct Item {
        #[allow(dead_code)]
        name: String,
    }

    impl JsonSchema for Item {
        fn schema_name() -> Option<&'static str> {
            Some("Item")
        }
        fn schema() -> Schema {
            Schema::object().required_property("name", Schema::string())
        }
    }

    fn compile(signature: &Signature, template: &str) -> Result<BindingPlan, ConfigurationError> {
        let template = PathTemplate::parse(template).unwrap();
        BindingPlan::compile(signature, &template, &CompileOptions::default())
    }

    #[test]
    fn test_classifies_every_kind() {
        let signature = Signature::new("update_item")
            .param(Param::request())
            .param(Param::depends("db", Dependency::sync(|| Ok(1_u8))))
            .param(Param::body::<Item>("item"))
            .param(Param::background_tasks("tasks"))
            .param(Param::typed::<i64>("item_id"))
            .param(Param::typed::<String>("q").optional())
            .param(Param::typed::<i64>("limit").with_default(10))
            .param(Param::typed::<bool>("verbose"));

        let plan = compile(&signature, "/items/{item_id}").unwrap();

        assert!(plan.wants_request());
        assert!(plan.wants_background_tasks());
        assert_eq!(plan.dependencies()["db"].kind(), DependencyKind::Sync);
        assert_eq!(plan.body().unwrap().name, "item");
        assert_eq!(plan.path_params()["item_id"], ScalarType::Integer);

        let q = &plan.query_params()["q"];
        assert!(q.optional);
        assert_eq!(q.default, None);
        assert_eq!(
            plan.query_params()["limit"].default,
            Some(ScalarValue::Integer(10))
        );
        assert!(plan.query_params()["verbose"].required());
        assert!(plan.unbound().is_empty());
    }

    #[test]
    fn test_unannotated_path_param_is_string() {
        let signature = Signature::new("get_user").param(Param::new("user_id"));
        let plan = compile(&signature, "/users/{user_id}").unwrap();
        assert_eq!(plan.path_params()["user_id"], ScalarType::String);
    }

    #[test]
    fn test_request_rule_wins_over_placeholder() {
        let signature = Signature::new("echo").param(Param::request());
        let err = compile(&signature, "/echo/{request}").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::PathParamMismatch { ref missing, .. } if missing == &["request"]
        ));
    }

    #[test]
    fn test_dependency_rule_wins_over_scalar_annotation() {
        let param = Param::depends("user", Dependency::sync(|| Ok(7_i64)))
            .annotated(Annotation::Scalar(ScalarType::Integer));
        let plan = compile(&Signature::new("me").param(param), "/me").unwrap();
        assert!(plan.dependencies().contains_key("user"));
        assert!(plan.query_params().is_empty());
    }

    #[test]
    fn test_second_body_is_rejected() {
        let signature = Signature::new("create")
            .param(Param::body::<Item>("first"))
            .param(Param::body::<Item>("second"));
        let err = compile(&signature, "/items").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateBody {
                route: "create".into(),
                first: "first".into(),
                second: "second".into(),
            }
        );
    }

    #[test]
    fn test_missing_path_param_is_rejected() {
        let signature = Signature::new("get_item").param(Param::typed::<i64>("id"));
        let err = compile(&signature, "/items/{item_id}").unwrap_err();
        match err {
            ConfigurationError::PathParamMismatch {
                missing, unexpected, ..
            } => {
                assert_eq!(missing, vec!["item_id"]);
                assert!(unexpected.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_scalar_path_param_is_rejected() {
        let signature = Signature::new("get").param(Param::opaque("id", "Uuid"));
        let err = compile(&signature, "/things/{id}").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedPathType { .. }));
    }

    #[test]
    fn test_invalid_default_is_rejected() {
        let signature =
            Signature::new("list").param(Param::typed::<i64>("limit").with_default("ten"));
        let err = compile(&signature, "/items").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidDefault { ref expected, .. } if expected == "integer"
        ));
    }

    #[test]
    fn test_integer_default_widens_to_float() {
        let signature =
            Signature::new("list").param(Param::typed::<f64>("ratio").with_default(1));
        let plan = compile(&signature, "/items").unwrap();
        assert_eq!(
            plan.query_params()["ratio"].default,
            Some(ScalarValue::Float(1.0))
        );
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let signature = Signature::new("list")
            .param(Param::typed::<i64>("page"))
            .param(Param::typed::<String>("page"));
        let err = compile(&signature, "/items").unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateParameter { .. }));
    }

    #[test]
    fn test_unbound_parameter_warns_or_fails() {
        let signature = Signature::new("odd").param(Param::opaque("clock", "Clock"));
        let plan = compile(&signature, "/odd").unwrap();
        assert_eq!(plan.unbound(), ["clock"]);

        let template = PathTemplate::parse("/odd").unwrap();
        let strict = CompileOptions {
            strict_signatures: true,
        };
        let err = BindingPlan::compile(&signature, &template, &strict).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnboundParameter { .. }));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let signature = Signature::new("search")
            .param(Param::typed::<String>("b"))
            .param(Param::typed::<String>("a"));
        let first = compile(&signature, "/search").unwrap();
        let second = compile(&signature, "/search").unwrap();
        let keys = |plan: &BindingPlan| plan.query_params().keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&first), vec!["b", "a"]);
        assert_eq!(keys(&first), keys(&second));
    }
}
