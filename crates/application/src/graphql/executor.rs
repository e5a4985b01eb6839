use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::ast::*;
use super::parser::parse_query;
use super::request::QueryRequest;
use super::response::{ExecutionResult, GraphQlError, PathSegment};
use super::schema::{Arguments, ObjectType, Schema};
use super::validation::validate;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A non-null position resolved to null. The nearest nullable ancestor turns
/// it into `null`; the error itself has already been recorded.
struct NullBubble;

/// Runs one request against `schema`: parse, validate, pick the operation,
/// coerce variables, then resolve the root selection set field by field.
///
/// Request-level failures (syntax, validation, operation selection, variable
/// coercion) produce `data: null`. Field failures leave `data` in place with
/// the failing field nulled and an error carrying its path.
pub async fn execute(schema: &Schema, request: &QueryRequest) -> ExecutionResult {
    let document = match parse_query(&request.query) {
        Ok(document) => document,
        Err(err) => return ExecutionResult::from_errors(vec![err.into()]),
    };

    let errors = validate(schema, &document);
    if !errors.is_empty() {
        return ExecutionResult::from_errors(errors);
    }

    let operation = match select_operation(&document, request.operation_name.as_deref()) {
        Ok(operation) => operation,
        Err(err) => return ExecutionResult::from_errors(vec![err]),
    };

    let variables = match coerce_variables(operation, request.variables.as_ref()) {
        Ok(variables) => variables,
        Err(errors) => return ExecutionResult::from_errors(errors),
    };

    let context = ExecutionContext {
        schema,
        fragments: document
            .fragments()
            .map(|fragment| (fragment.name.as_str(), fragment))
            .collect(),
        variables,
    };

    let mut errors = Vec::new();
    let data = context
        .execute_selection_set(
            schema.query_type(),
            &JsonValue::Null,
            vec![&operation.selection_set],
            Vec::new(),
            &mut errors,
        )
        .await;

    ExecutionResult {
        data: data.ok(),
        errors,
    }
}

fn select_operation<'a>(
    document: &'a Document,
    operation_name: Option<&str>,
) -> Result<&'a OperationDefinition, GraphQlError> {
    match operation_name {
        Some(name) => document
            .operations()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| GraphQlError::new(format!("Unknown operation named \"{}\".", name))),
        None => {
            let mut operations = document.operations();
            match (operations.next(), operations.next()) {
                (Some(operation), None) => Ok(operation),
                (None, _) => Err(GraphQlError::new("Must provide an operation.")),
                (Some(_), Some(_)) => Err(GraphQlError::new(
                    "Must provide operation name if query contains multiple operations.",
                )),
            }
        }
    }
}

fn coerce_variables(
    operation: &OperationDefinition,
    inputs: Option<&JsonMap<String, JsonValue>>,
) -> Result<JsonMap<String, JsonValue>, Vec<GraphQlError>> {
    let mut coerced = JsonMap::new();
    let mut errors = Vec::new();

    for definition in &operation.variable_definitions {
        let name = &definition.name;
        match inputs.and_then(|inputs| inputs.get(name)) {
            None => {
                if let Some(default) = &definition.default_value {
                    coerced.insert(name.clone(), default.to_json(&JsonMap::new()));
                } else if definition.var_type.is_non_null() {
                    errors.push(
                        GraphQlError::new(format!(
                            "Variable \"${}\" of required type \"{}\" was not provided.",
                            name, definition.var_type
                        ))
                        .at(definition.position),
                    );
                }
            }
            Some(JsonValue::Null) if definition.var_type.is_non_null() => errors.push(
                GraphQlError::new(format!(
                    "Variable \"${}\" of non-null type \"{}\" must not be null.",
                    name, definition.var_type
                ))
                .at(definition.position),
            ),
            Some(value) => match coerce_input(&definition.var_type, value) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                }
                Err(reason) => errors.push(
                    GraphQlError::new(format!(
                        "Variable \"${}\" got invalid value {}; {}",
                        name, value, reason
                    ))
                    .at(definition.position),
                ),
            },
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

fn coerce_input(var_type: &TypeRef, value: &JsonValue) -> Result<JsonValue, String> {
    match var_type {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                Err(format!(
                    "Expected non-nullable type \"{}\" not to be null.",
                    var_type
                ))
            } else {
                coerce_input(inner, value)
            }
        }
        _ if value.is_null() => Ok(JsonValue::Null),
        TypeRef::List(inner) => match value {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| coerce_input(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            single => coerce_input(inner, single).map(|item| JsonValue::Array(vec![item])),
        },
        TypeRef::Named(name) => coerce_input_scalar(name, value),
    }
}

fn coerce_input_scalar(type_name: &str, value: &JsonValue) -> Result<JsonValue, String> {
    match type_name {
        "String" if value.is_string() => Ok(value.clone()),
        "String" => Err(format!("String cannot represent a non string value: {}", value)),
        "ID" => match value {
            JsonValue::String(_) => Ok(value.clone()),
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => {
                Ok(JsonValue::String(n.to_string()))
            }
            _ => Err(format!("ID cannot represent value: {}", value)),
        },
        "Int" => match value.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => Ok(value.clone()),
            Some(_) => Err(format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                value
            )),
            None => Err(format!("Int cannot represent non-integer value: {}", value)),
        },
        "Float" if value.is_number() => Ok(value.clone()),
        "Float" => Err(format!("Float cannot represent non numeric value: {}", value)),
        "Boolean" if value.is_boolean() => Ok(value.clone()),
        "Boolean" => Err(format!(
            "Boolean cannot represent a non boolean value: {}",
            value
        )),
        other => Err(format!("Unknown type \"{}\".", other)),
    }
}

/// Serializes a resolved leaf according to its scalar type.
fn coerce_output_scalar(type_name: &str, value: &JsonValue) -> Result<JsonValue, String> {
    match (type_name, value) {
        ("String", JsonValue::String(_)) => Ok(value.clone()),
        ("String", JsonValue::Bool(_) | JsonValue::Number(_)) => {
            Ok(JsonValue::String(value.to_string()))
        }
        ("String", _) => Err(format!("String cannot represent value: {}", value)),
        ("ID", JsonValue::String(_)) => Ok(value.clone()),
        ("ID", JsonValue::Number(n)) if n.is_i64() || n.is_u64() => {
            Ok(JsonValue::String(n.to_string()))
        }
        ("ID", _) => Err(format!("ID cannot represent value: {}", value)),
        ("Int", JsonValue::Bool(b)) => Ok(JsonValue::from(i32::from(*b))),
        ("Int", JsonValue::Number(n)) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => Ok(value.clone()),
            Some(_) => Err(format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                value
            )),
            None => Err(format!("Int cannot represent non-integer value: {}", value)),
        },
        ("Int", _) => Err(format!("Int cannot represent non-integer value: {}", value)),
        ("Float", JsonValue::Number(_)) => Ok(value.clone()),
        ("Float", JsonValue::Bool(b)) => Ok(JsonValue::from(if *b { 1.0 } else { 0.0 })),
        ("Float", _) => Err(format!("Float cannot represent non numeric value: {}", value)),
        ("Boolean", JsonValue::Bool(_)) => Ok(value.clone()),
        ("Boolean", JsonValue::Number(n)) => Ok(JsonValue::Bool(n.as_f64() != Some(0.0))),
        ("Boolean", _) => Err(format!(
            "Boolean cannot represent a non boolean value: {}",
            value
        )),
        _ => Ok(value.clone()),
    }
}

struct ExecutionContext<'a> {
    schema: &'a Schema,
    fragments: HashMap<&'a str, &'a FragmentDefinition>,
    variables: JsonMap<String, JsonValue>,
}

impl<'a> ExecutionContext<'a> {
    /// Resolves the fields of `object` selected by `selection_sets`. Sibling
    /// fields run one after another in document order.
    fn execute_selection_set<'b>(
        &'b self,
        object: &'b ObjectType,
        parent: &'b JsonValue,
        selection_sets: Vec<&'a SelectionSet>,
        path: Vec<PathSegment>,
        errors: &'b mut Vec<GraphQlError>,
    ) -> BoxFuture<'b, Result<JsonValue, NullBubble>> {
        Box::pin(async move {
            let grouped = self.collect_fields(object, &selection_sets);
            let mut data = JsonMap::new();

            for (key, fields) in grouped {
                let mut field_path = path.clone();
                field_path.push(PathSegment::Key(key.to_string()));
                let value = self
                    .execute_field(object, parent, &fields, field_path, &mut *errors)
                    .await?;
                data.insert(key.to_string(), value);
            }

            Ok(JsonValue::Object(data))
        })
    }

    async fn execute_field(
        &self,
        object: &ObjectType,
        parent: &JsonValue,
        fields: &[&'a Field],
        path: Vec<PathSegment>,
        errors: &mut Vec<GraphQlError>,
    ) -> Result<JsonValue, NullBubble> {
        let field = fields[0];
        if field.name == "__typename" {
            return Ok(JsonValue::String(object.name.clone()));
        }
        let Some(definition) = object.get_field(&field.name) else {
            return Ok(JsonValue::Null);
        };

        let resolved = match definition.field_resolver() {
            Some(resolver) => resolver.resolve(parent, &self.arguments(field)).await,
            None => Ok(parent
                .get(field.name.as_str())
                .cloned()
                .unwrap_or(JsonValue::Null)),
        };

        match resolved {
            Ok(value) => {
                self.complete_value(
                    &definition.field_type,
                    &object.name,
                    fields,
                    value,
                    path,
                    errors,
                )
                .await
            }
            Err(err) => {
                errors.push(
                    GraphQlError::new(err.0)
                        .at(field.position)
                        .with_path(path),
                );
                if definition.field_type.is_non_null() {
                    Err(NullBubble)
                } else {
                    Ok(JsonValue::Null)
                }
            }
        }
    }

    fn complete_value<'b>(
        &'b self,
        field_type: &'b TypeRef,
        parent_type: &'b str,
        fields: &'b [&'a Field],
        value: JsonValue,
        path: Vec<PathSegment>,
        errors: &'b mut Vec<GraphQlError>,
    ) -> BoxFuture<'b, Result<JsonValue, NullBubble>> {
        Box::pin(async move {
            let field = fields[0];
            match field_type {
                TypeRef::NonNull(inner) => {
                    if value.is_null() {
                        errors.push(
                            GraphQlError::new(format!(
                                "Cannot return null for non-nullable field {}.{}.",
                                parent_type, field.name
                            ))
                            .at(field.position)
                            .with_path(path),
                        );
                        return Err(NullBubble);
                    }
                    match self
                        .complete_value(inner, parent_type, fields, value, path, errors)
                        .await
                    {
                        Ok(JsonValue::Null) | Err(NullBubble) => Err(NullBubble),
                        Ok(completed) => Ok(completed),
                    }
                }
                _ if value.is_null() => Ok(JsonValue::Null),
                TypeRef::List(inner) => {
                    let JsonValue::Array(items) = value else {
                        errors.push(
                            GraphQlError::new(format!(
                                "Expected Iterable, but did not find one for field \"{}.{}\".",
                                parent_type, field.name
                            ))
                            .at(field.position)
                            .with_path(path),
                        );
                        return Ok(JsonValue::Null);
                    };
                    let mut completed = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let mut item_path = path.clone();
                        item_path.push(PathSegment::Index(index));
                        match self
                            .complete_value(inner, parent_type, fields, item, item_path, &mut *errors)
                            .await
                        {
                            Ok(item) => completed.push(item),
                            Err(NullBubble) => return Ok(JsonValue::Null),
                        }
                    }
                    Ok(JsonValue::Array(completed))
                }
                TypeRef::Named(type_name) => match self.schema.object(type_name) {
                    Some(object) => {
                        let selection_sets = fields.iter().map(|&f| &f.selection_set).collect();
                        Ok(self
                            .execute_selection_set(object, &value, selection_sets, path, errors)
                            .await
                            .unwrap_or(JsonValue::Null))
                    }
                    None => match coerce_output_scalar(type_name, &value) {
                        Ok(scalar) => Ok(scalar),
                        Err(message) => {
                            errors.push(
                                GraphQlError::new(message)
                                    .at(field.position)
                                    .with_path(path),
                            );
                            Ok(JsonValue::Null)
                        }
                    },
                },
            }
        })
    }

    /// Argument values as written on the field, with variables substituted.
    /// Arguments bound to a variable that was not supplied are left out.
    fn arguments(&self, field: &Field) -> Arguments {
        let mut values = JsonMap::new();
        for (name, value) in &field.arguments {
            if let Value::Variable(variable) = value {
                if !self.variables.contains_key(variable) {
                    continue;
                }
            }
            values.insert(name.clone(), value.to_json(&self.variables));
        }
        Arguments::new(values)
    }

    /// Groups the selected fields by response key, keeping first-seen order
    /// and dropping anything excluded by `@skip`/`@include`.
    fn collect_fields(
        &self,
        object: &ObjectType,
        selection_sets: &[&'a SelectionSet],
    ) -> Vec<(&'a str, Vec<&'a Field>)> {
        let mut grouped = Vec::new();
        let mut visited = HashSet::new();
        for selection_set in selection_sets {
            self.collect_into(object, selection_set, &mut grouped, &mut visited);
        }
        grouped
    }

    fn collect_into(
        &self,
        object: &ObjectType,
        selection_set: &'a SelectionSet,
        grouped: &mut Vec<(&'a str, Vec<&'a Field>)>,
        visited: &mut HashSet<&'a str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if !self.should_include(&field.directives) {
                        continue;
                    }
                    let key = field.response_key();
                    match grouped.iter_mut().find(|(existing, _)| *existing == key) {
                        Some((_, fields)) => fields.push(field),
                        None => grouped.push((key, vec![field])),
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.should_include(&spread.directives)
                        || !visited.insert(spread.fragment_name.as_str())
                    {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()).copied()
                    else {
                        continue;
                    };
                    if fragment.type_condition == object.name {
                        self.collect_into(object, &fragment.selection_set, grouped, visited);
                    }
                }
                Selection::InlineFragment(inline) => {
                    if !self.should_include(&inline.directives) {
                        continue;
                    }
                    if inline
                        .type_condition
                        .as_deref()
                        .is_some_and(|condition| condition != object.name)
                    {
                        continue;
                    }
                    self.collect_into(object, &inline.selection_set, grouped, visited);
                }
            }
        }
    }

    fn should_include(&self, directives: &[Directive]) -> bool {
        for directive in directives {
            let condition = directive
                .arguments
                .iter()
                .find(|(name, _)| name == "if")
                .map(|(_, value)| value.to_json(&self.variables));
            let condition = matches!(condition, Some(JsonValue::Bool(true)));
            match directive.name.as_str() {
                "skip" if condition => return false,
                "include" if !condition => return false,
                _ => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::schema::{ArgumentDefinition, FieldDefinition, FieldError, FieldResolver};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl FieldResolver for Echo {
        async fn resolve(
            &self,
            _parent: &JsonValue,
            args: &Arguments,
        ) -> Result<JsonValue, FieldError> {
            match args.get_str("word") {
                Some("fail") => Err(FieldError::new("echo failed")),
                Some(word) => Ok(json!({
                    "word": word,
                    "length": word.len(),
                    "tags": ["a", null],
                    "strictTags": ["a", null]
                })),
                None => Ok(JsonValue::Null),
            }
        }
    }

    fn schema() -> Schema {
        Schema::builder()
            .object(
                ObjectType::new("Echo")
                    .field(FieldDefinition::new("word", TypeRef::non_null(TypeRef::named("String"))))
                    .field(FieldDefinition::new("length", TypeRef::named("Int")))
                    .field(FieldDefinition::new(
                        "tags",
                        TypeRef::list(TypeRef::named("String")),
                    ))
                    .field(FieldDefinition::new(
                        "strictTags",
                        TypeRef::list(TypeRef::non_null(TypeRef::named("String"))),
                    )),
            )
            .query(
                ObjectType::new("Query")
                    .field(
                        FieldDefinition::new("echo", TypeRef::named("Echo"))
                            .argument(ArgumentDefinition::new("word", TypeRef::named("String")))
                            .resolver(Arc::new(Echo)),
                    )
                    .field(
                        FieldDefinition::new("mustEcho", TypeRef::non_null(TypeRef::named("Echo")))
                            .argument(ArgumentDefinition::new("word", TypeRef::named("String")))
                            .resolver(Arc::new(Echo)),
                    ),
            )
            .finish()
            .unwrap()
    }

    async fn run(request: QueryRequest) -> JsonValue {
        let result = execute(&schema(), &request).await;
        serde_json::to_value(result).unwrap()
    }

    async fn run_query(query: &str) -> JsonValue {
        run(QueryRequest::new(query)).await
    }

    #[tokio::test]
    async fn test_resolves_nested_fields_in_query_order() {
        let body = run_query(r#"{ echo(word: "hi") { length word } }"#).await;
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"data":{"echo":{"length":2,"word":"hi"}},"errors":[]}"#
        );
    }

    #[tokio::test]
    async fn test_aliases_and_typename() {
        let body = run_query(r#"{ a: echo(word: "x") { w: word __typename } __typename }"#).await;
        assert_eq!(
            body,
            json!({
                "data": { "a": { "w": "x", "__typename": "Echo" }, "__typename": "Query" },
                "errors": []
            })
        );
    }

    #[tokio::test]
    async fn test_field_error_nulls_only_that_field() {
        let body = run_query(r#"{ ok: echo(word: "fine") { word } bad: echo(word: "fail") { word } }"#).await;
        assert_eq!(body["data"], json!({ "ok": { "word": "fine" }, "bad": null }));
        assert_eq!(
            body["errors"],
            json!([{ "message": "echo failed", "locations": [{ "line": 1, "column": 35 }], "path": ["bad"] }])
        );
    }

    #[tokio::test]
    async fn test_non_null_error_bubbles_to_data() {
        let body = run_query(r#"{ mustEcho(word: "fail") { word } }"#).await;
        assert_eq!(body["data"], JsonValue::Null);
        assert_eq!(body["errors"][0]["message"], "echo failed");
    }

    #[tokio::test]
    async fn test_null_resolver_result_is_null() {
        let body = run_query("{ echo { word } }").await;
        assert_eq!(body, json!({ "data": { "echo": null }, "errors": [] }));
    }

    #[tokio::test]
    async fn test_list_completion_and_non_null_items() {
        let body = run_query(r#"{ echo(word: "x") { tags strictTags } }"#).await;
        assert_eq!(
            body["data"],
            json!({ "echo": { "tags": ["a", null], "strictTags": null } })
        );
        assert_eq!(
            body["errors"],
            json!([{
                "message": "Cannot return null for non-nullable field Echo.strictTags.",
                "locations": [{ "line": 1, "column": 26 }],
                "path": ["echo", "strictTags", 1]
            }])
        );
    }

    #[tokio::test]
    async fn test_skip_and_include() {
        let request = QueryRequest::new(
            r#"query ($hide: Boolean!) { echo(word: "x") { word @skip(if: $hide) length @include(if: false) ...F } } fragment F on Echo { tags @include(if: true) }"#,
        )
        .with_variables(json!({ "hide": true }).as_object().cloned());
        let body = run(request).await;
        assert_eq!(body["data"], json!({ "echo": { "tags": ["a", null] } }));
    }

    #[tokio::test]
    async fn test_variables_feed_arguments() {
        let request = QueryRequest::new("query Q($w: String) { echo(word: $w) { word } }")
            .with_variables(json!({ "w": "var" }).as_object().cloned());
        let body = run(request).await;
        assert_eq!(body["data"], json!({ "echo": { "word": "var" } }));

        let body = run_query("query Q($w: String) { echo(word: $w) { word } }").await;
        assert_eq!(body["data"], json!({ "echo": null }));
    }

    #[tokio::test]
    async fn test_variable_coercion_errors() {
        let request = QueryRequest::new("query Q($w: String!) { echo(word: $w) { word } }");
        let body = run(request).await;
        assert_eq!(body["data"], JsonValue::Null);
        assert_eq!(
            body["errors"][0]["message"],
            "Variable \"$w\" of required type \"String!\" was not provided."
        );

        let request = QueryRequest::new("query Q($w: String) { echo(word: $w) { word } }")
            .with_variables(json!({ "w": 7 }).as_object().cloned());
        let body = run(request).await;
        assert_eq!(
            body["errors"][0]["message"],
            "Variable \"$w\" got invalid value 7; String cannot represent a non string value: 7"
        );
    }

    #[tokio::test]
    async fn test_operation_selection() {
        let query = r#"query A { echo(word: "a") { word } } query B { echo(word: "b") { word } }"#;

        let body = run_query(query).await;
        assert_eq!(body["data"], JsonValue::Null);
        assert_eq!(
            body["errors"][0]["message"],
            "Must provide operation name if query contains multiple operations."
        );

        let body = run(QueryRequest::new(query).with_operation_name(Some("B".to_string()))).await;
        assert_eq!(body["data"], json!({ "echo": { "word": "b" } }));

        let body = run(QueryRequest::new(query).with_operation_name(Some("C".to_string()))).await;
        assert_eq!(body["errors"][0]["message"], "Unknown operation named \"C\".");
    }

    #[tokio::test]
    async fn test_syntax_error_has_no_data() {
        let body = run_query("{ echo(word: ").await;
        assert_eq!(body["data"], JsonValue::Null);
        assert_eq!(body["errors"][0]["message"], "Syntax Error: Unexpected <EOF>.");
    }

    #[test]
    fn test_output_scalar_coercion() {
        assert_eq!(coerce_output_scalar("String", &json!(5)), Ok(json!("5")));
        assert_eq!(coerce_output_scalar("ID", &json!(5)), Ok(json!("5")));
        assert!(coerce_output_scalar("Int", &json!(1u64 << 40)).is_err());
        assert!(coerce_output_scalar("String", &json!({})).is_err());
    }
}
