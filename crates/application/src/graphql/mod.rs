//! A small GraphQL engine: lexer, parser, validation and execution over a
//! schema assembled in code.

pub mod ast;
mod executor;
mod lexer;
mod parser;
mod request;
mod response;
mod schema;
mod validation;

pub use ast::{Pos, TypeRef};
pub use executor::execute;
pub use lexer::SyntaxError;
pub use parser::parse_query;
pub use request::QueryRequest;
pub use response::{ExecutionResult, GraphQlError, PathSegment};
pub use schema::{
    ArgumentDefinition, Arguments, FieldDefinition, FieldError, FieldResolver, ObjectType,
    Schema, SchemaBuilder, SchemaError, TypeKind, BUILTIN_SCALARS,
};
pub use validation::validate;
