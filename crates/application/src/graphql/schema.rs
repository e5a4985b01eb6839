//! Type system: object types, built-in scalars and field resolvers.

use async_trait::async_trait;
use rdns_graphql_domain::DomainError;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::ast::TypeRef;

pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Coerced argument values handed to a resolver. Arguments the query did not
/// supply are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(JsonMap<String, JsonValue>);

impl Arguments {
    pub fn new(values: JsonMap<String, JsonValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// The argument as a string, or `None` when absent, null or of another type.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(JsonValue::as_str)
    }
}

/// Message-only error raised by a resolver; the executor attaches the path
/// and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError(pub String);

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DomainError> for FieldError {
    fn from(err: DomainError) -> Self {
        FieldError(err.to_string())
    }
}

/// Computes a field value from the parent value and the field arguments.
/// Fields without a resolver read the same-named key of the parent object.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, parent: &JsonValue, args: &Arguments)
        -> Result<JsonValue, FieldError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema has no query type")]
    MissingQueryType,

    #[error("Type \"{0}\" is defined more than once")]
    DuplicateType(String),

    #[error("Type \"{0}\" must define one or more fields")]
    EmptyObject(String),

    #[error("Field \"{type_name}.{field}\" is defined more than once")]
    DuplicateField { type_name: String, field: String },

    #[error("Argument \"{field}({argument}:)\" is defined more than once")]
    DuplicateArgument { field: String, argument: String },

    #[error("Unknown type \"{type_name}\" referenced by \"{referenced_by}\"")]
    UnknownType {
        type_name: String,
        referenced_by: String,
    },

    #[error("Argument \"{argument}\" must be an input type but got \"{type_name}\"")]
    NonInputArgument { argument: String, type_name: String },

    #[error("Name \"{0}\" is not a valid GraphQL name")]
    InvalidName(String),
}

#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub arg_type: TypeRef,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, arg_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            arg_type,
        }
    }
}

#[derive(Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeRef,
    pub arguments: Vec<ArgumentDefinition>,
    resolver: Option<Arc<dyn FieldResolver>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type,
            arguments: Vec::new(),
            resolver: None,
        }
    }

    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn get_argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    pub(crate) fn field_resolver(&self) -> Option<&Arc<dyn FieldResolver>> {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
}

/// Validated, immutable schema. Only built through [`SchemaBuilder::finish`].
#[derive(Debug)]
pub struct Schema {
    objects: HashMap<String, ObjectType>,
    query_type: String,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn query_type(&self) -> &ObjectType {
        &self.objects[&self.query_type]
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn type_kind(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            Some(TypeKind::Scalar)
        } else if self.objects.contains_key(name) {
            Some(TypeKind::Object)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    objects: Vec<ObjectType>,
    query_type: Option<String>,
}

impl SchemaBuilder {
    pub fn object(mut self, object: ObjectType) -> Self {
        self.objects.push(object);
        self
    }

    /// Registers `object` and makes it the root query type.
    pub fn query(mut self, object: ObjectType) -> Self {
        self.query_type = Some(object.name.clone());
        self.objects.push(object);
        self
    }

    pub fn finish(self) -> Result<Schema, SchemaError> {
        let query_type = self.query_type.ok_or(SchemaError::MissingQueryType)?;

        let mut objects = HashMap::with_capacity(self.objects.len());
        for object in self.objects {
            check_name(&object.name)?;
            if BUILTIN_SCALARS.contains(&object.name.as_str())
                || objects.contains_key(&object.name)
            {
                return Err(SchemaError::DuplicateType(object.name));
            }
            objects.insert(object.name.clone(), object);
        }

        for object in objects.values() {
            check_object(object, &objects)?;
        }

        Ok(Schema {
            objects,
            query_type,
        })
    }
}

fn check_object(
    object: &ObjectType,
    objects: &HashMap<String, ObjectType>,
) -> Result<(), SchemaError> {
    if object.fields.is_empty() {
        return Err(SchemaError::EmptyObject(object.name.clone()));
    }

    for (i, field) in object.fields.iter().enumerate() {
        check_name(&field.name)?;
        if object.fields[..i].iter().any(|f| f.name == field.name) {
            return Err(SchemaError::DuplicateField {
                type_name: object.name.clone(),
                field: field.name.clone(),
            });
        }

        let referenced = field.field_type.named_type();
        if !BUILTIN_SCALARS.contains(&referenced) && !objects.contains_key(referenced) {
            return Err(SchemaError::UnknownType {
                type_name: referenced.to_string(),
                referenced_by: format!("{}.{}", object.name, field.name),
            });
        }

        for (j, argument) in field.arguments.iter().enumerate() {
            check_name(&argument.name)?;
            if field.arguments[..j].iter().any(|a| a.name == argument.name) {
                return Err(SchemaError::DuplicateArgument {
                    field: format!("{}.{}", object.name, field.name),
                    argument: argument.name.clone(),
                });
            }

            let arg_type = argument.arg_type.named_type();
            if objects.contains_key(arg_type) {
                return Err(SchemaError::NonInputArgument {
                    argument: argument.name.clone(),
                    type_name: arg_type.to_string(),
                });
            }
            if !BUILTIN_SCALARS.contains(&arg_type) {
                return Err(SchemaError::UnknownType {
                    type_name: arg_type.to_string(),
                    referenced_by: format!("{}.{}({}:)", object.name, field.name, argument.name),
                });
            }
        }
    }

    Ok(())
}

fn check_name(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !name.starts_with("__");
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}
