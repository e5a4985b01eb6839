//! Static checks of a parsed document against the schema. Every rule runs
//! over the whole document; execution only starts when no error was found.

use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::response::GraphQlError;
use super::schema::{ObjectType, Schema, TypeKind};

/// Longest chain of fragments spreading one another that a document may use.
const MAX_FRAGMENT_DEPTH: usize = 32;

pub fn validate(schema: &Schema, document: &Document) -> Vec<GraphQlError> {
    let mut validator = Validator::new(schema, document);
    validator.check_fragment_depth();
    if !validator.errors.is_empty() {
        return validator.errors;
    }
    validator.check_operations();
    validator.check_fragments();
    validator.errors
}

struct Validator<'a> {
    schema: &'a Schema,
    document: &'a Document,
    fragments: HashMap<&'a str, &'a FragmentDefinition>,
    errors: Vec<GraphQlError>,
}

impl<'a> Validator<'a> {
    fn new(schema: &'a Schema, document: &'a Document) -> Self {
        let mut fragments = HashMap::new();
        for fragment in document.fragments() {
            fragments.entry(fragment.name.as_str()).or_insert(fragment);
        }
        Self {
            schema,
            document,
            fragments,
            errors: Vec::new(),
        }
    }

    fn report(&mut self, message: String, pos: Pos) {
        self.errors.push(GraphQlError::new(message).at(pos));
    }

    fn check_operations(&mut self) {
        let document = self.document;
        let operation_count = document.operations().count();
        let mut seen_names = HashSet::new();

        for operation in document.operations() {
            match &operation.name {
                None if operation_count > 1 => self.report(
                    "This anonymous operation must be the only defined operation.".to_string(),
                    operation.position,
                ),
                Some(name) if !seen_names.insert(name.as_str()) => self.report(
                    format!("There can be only one operation named \"{}\".", name),
                    operation.position,
                ),
                _ => {}
            }

            self.check_directives(&operation.directives);

            if operation.operation_type != OperationType::Query {
                self.report(
                    format!(
                        "Schema is not configured for {}s.",
                        operation.operation_type
                    ),
                    operation.position,
                );
                continue;
            }

            self.check_variable_definitions(operation);
            let root = self.schema.query_type();
            self.check_selection_set(root, &operation.selection_set);
            self.check_variable_usage(operation);
        }
    }

    fn check_variable_definitions(&mut self, operation: &OperationDefinition) {
        let mut seen = HashSet::new();
        for definition in &operation.variable_definitions {
            if !seen.insert(definition.name.as_str()) {
                self.report(
                    format!(
                        "There can be only one variable named \"${}\".",
                        definition.name
                    ),
                    definition.position,
                );
            }

            let type_name = definition.var_type.named_type();
            match self.schema.type_kind(type_name) {
                None => self.report(
                    format!("Unknown type \"{}\".", type_name),
                    definition.position,
                ),
                Some(TypeKind::Object) => self.report(
                    format!(
                        "Variable \"${}\" cannot be non-input type \"{}\".",
                        definition.name, definition.var_type
                    ),
                    definition.position,
                ),
                Some(TypeKind::Scalar) => {}
            }
        }
    }

    fn check_variable_usage(&mut self, operation: &'a OperationDefinition) {
        let mut used: Vec<(&'a str, Pos)> = Vec::new();
        let mut visited = HashSet::new();
        for directive in &operation.directives {
            collect_directive_variables(directive, &mut used);
        }
        self.collect_variables(&operation.selection_set, &mut used, &mut visited);

        let defined: HashSet<&str> = operation
            .variable_definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect();

        let mut reported = HashSet::new();
        for (name, pos) in &used {
            if !defined.contains(name) && reported.insert(*name) {
                let message = match &operation.name {
                    Some(op) => format!(
                        "Variable \"${}\" is not defined by operation \"{}\".",
                        name, op
                    ),
                    None => format!("Variable \"${}\" is not defined.", name),
                };
                self.report(message, *pos);
            }
        }
    }

    fn collect_variables(
        &self,
        selection_set: &'a SelectionSet,
        used: &mut Vec<(&'a str, Pos)>,
        visited: &mut HashSet<&'a str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    for (_, value) in &field.arguments {
                        value.for_each_variable(&mut |name| used.push((name, field.position)));
                    }
                    for directive in &field.directives {
                        collect_directive_variables(directive, used);
                    }
                    self.collect_variables(&field.selection_set, used, visited);
                }
                Selection::FragmentSpread(spread) => {
                    for directive in &spread.directives {
                        collect_directive_variables(directive, used);
                    }
                    if !visited.insert(spread.fragment_name.as_str()) {
                        continue;
                    }
                    if let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()).copied() {
                        self.collect_variables(&fragment.selection_set, used, visited);
                    }
                }
                Selection::InlineFragment(inline) => {
                    for directive in &inline.directives {
                        collect_directive_variables(directive, used);
                    }
                    self.collect_variables(&inline.selection_set, used, visited);
                }
            }
        }
    }

    fn check_fragments(&mut self) {
        let document = self.document;
        let mut seen = HashSet::new();

        for fragment in document.fragments() {
            if !seen.insert(fragment.name.as_str()) {
                self.report(
                    format!(
                        "There can be only one fragment named \"{}\".",
                        fragment.name
                    ),
                    fragment.position,
                );
            }

            if self.spreads_itself(fragment) {
                self.report(
                    format!("Cannot spread fragment \"{}\" within itself.", fragment.name),
                    fragment.position,
                );
            }

            self.check_directives(&fragment.directives);

            match self.schema.type_kind(&fragment.type_condition) {
                None => self.report(
                    format!("Unknown type \"{}\".", fragment.type_condition),
                    fragment.position,
                ),
                Some(TypeKind::Scalar) => self.report(
                    format!(
                        "Fragment \"{}\" cannot condition on non composite type \"{}\".",
                        fragment.name, fragment.type_condition
                    ),
                    fragment.position,
                ),
                Some(TypeKind::Object) => {
                    if let Some(object) = self.schema.object(&fragment.type_condition) {
                        self.check_selection_set(object, &fragment.selection_set);
                    }
                }
            }
        }
    }

    /// Rejects documents whose fragment spreads chain deeper than
    /// `MAX_FRAGMENT_DEPTH`. Later passes follow spreads recursively.
    fn check_fragment_depth(&mut self) {
        let document = self.document;
        let depths = self.fragment_depths();
        let deepest = document
            .fragments()
            .filter_map(|fragment| Some((fragment, *depths.get(fragment.name.as_str())?)))
            .max_by_key(|(_, depth)| *depth);

        if let Some((fragment, depth)) = deepest {
            if depth > MAX_FRAGMENT_DEPTH {
                self.report(
                    format!(
                        "Fragment \"{}\" spreads fragments {} levels deep, more than the allowed {}.",
                        fragment.name, depth, MAX_FRAGMENT_DEPTH
                    ),
                    fragment.position,
                );
            }
        }
    }

    /// Length of the longest spread chain starting at each fragment, counting
    /// the fragment itself. Back edges of cycles are ignored.
    fn fragment_depths(&self) -> HashMap<&'a str, usize> {
        let mut depths: HashMap<&'a str, usize> = HashMap::new();
        let mut in_progress = HashSet::new();

        for &root in self.fragments.keys() {
            let mut stack = vec![(root, false)];
            while let Some((name, expanded)) = stack.pop() {
                if depths.contains_key(name) {
                    continue;
                }
                let Some(fragment) = self.fragments.get(name).copied() else {
                    continue;
                };
                let mut spreads = HashSet::new();
                collect_spread_names(&fragment.selection_set, &mut spreads);

                if expanded {
                    let deepest = spreads
                        .iter()
                        .filter_map(|spread| depths.get(spread))
                        .max()
                        .copied()
                        .unwrap_or(0);
                    depths.insert(name, deepest + 1);
                    in_progress.remove(name);
                } else if in_progress.insert(name) {
                    stack.push((name, true));
                    stack.extend(
                        spreads
                            .into_iter()
                            .filter(|spread| !in_progress.contains(spread))
                            .map(|spread| (spread, false)),
                    );
                }
            }
        }
        depths
    }

    fn spreads_itself(&self, fragment: &'a FragmentDefinition) -> bool {
        let mut stack = Vec::new();
        let mut visited = HashSet::new();
        let mut direct = HashSet::new();
        collect_spread_names(&fragment.selection_set, &mut direct);
        stack.extend(direct);

        while let Some(name) = stack.pop() {
            if name == fragment.name {
                return true;
            }
            if !visited.insert(name) {
                continue;
            }
            if let Some(next) = self.fragments.get(name).copied() {
                let mut nested = HashSet::new();
                collect_spread_names(&next.selection_set, &mut nested);
                stack.extend(nested);
            }
        }
        false
    }

    fn check_selection_set(&mut self, parent: &ObjectType, selection_set: &SelectionSet) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    self.check_directives(&field.directives);
                    self.check_field(parent, field);
                }
                Selection::FragmentSpread(spread) => {
                    self.check_directives(&spread.directives);
                    let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()).copied()
                    else {
                        self.report(
                            format!("Unknown fragment \"{}\".", spread.fragment_name),
                            spread.position,
                        );
                        continue;
                    };
                    let condition = fragment.type_condition.as_str();
                    if self.schema.type_kind(condition) == Some(TypeKind::Object)
                        && condition != parent.name
                    {
                        self.report(
                            format!(
                                "Fragment \"{}\" cannot be spread here as objects of type \"{}\" can never be of type \"{}\".",
                                spread.fragment_name, parent.name, condition
                            ),
                            spread.position,
                        );
                    }
                }
                Selection::InlineFragment(inline) => {
                    self.check_directives(&inline.directives);
                    let Some(condition) = inline.type_condition.as_deref() else {
                        self.check_selection_set(parent, &inline.selection_set);
                        continue;
                    };
                    match self.schema.type_kind(condition) {
                        None => self.report(
                            format!("Unknown type \"{}\".", condition),
                            inline.position,
                        ),
                        Some(TypeKind::Scalar) => self.report(
                            format!(
                                "Fragment cannot condition on non composite type \"{}\".",
                                condition
                            ),
                            inline.position,
                        ),
                        Some(TypeKind::Object) if condition != parent.name => self.report(
                            format!(
                                "Fragment cannot be spread here as objects of type \"{}\" can never be of type \"{}\".",
                                parent.name, condition
                            ),
                            inline.position,
                        ),
                        Some(TypeKind::Object) => {
                            self.check_selection_set(parent, &inline.selection_set)
                        }
                    }
                }
            }
        }
    }

    fn check_field(&mut self, parent: &ObjectType, field: &Field) {
        if field.name == "__typename" {
            if !field.selection_set.is_empty() {
                self.report(
                    "Field \"__typename\" must not have a selection since type \"String!\" has no subfields."
                        .to_string(),
                    field.position,
                );
            }
            return;
        }

        let Some(definition) = parent.get_field(&field.name) else {
            self.report(
                format!(
                    "Cannot query field \"{}\" on type \"{}\".",
                    field.name, parent.name
                ),
                field.position,
            );
            return;
        };

        for (name, _) in &field.arguments {
            if definition.get_argument(name).is_none() {
                self.report(
                    format!(
                        "Unknown argument \"{}\" on field \"{}.{}\".",
                        name, parent.name, field.name
                    ),
                    field.position,
                );
            }
        }

        let type_name = definition.field_type.named_type();
        match self.schema.object(type_name) {
            Some(object) => {
                if field.selection_set.is_empty() {
                    self.report(
                        format!(
                            "Field \"{}\" of type \"{}\" must have a selection of subfields. Did you mean \"{} {{ ... }}\"?",
                            field.name, definition.field_type, field.name
                        ),
                        field.position,
                    );
                } else {
                    self.check_selection_set(object, &field.selection_set);
                }
            }
            None => {
                if !field.selection_set.is_empty() {
                    self.report(
                        format!(
                            "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                            field.name, definition.field_type
                        ),
                        field.position,
                    );
                }
            }
        }
    }

    fn check_directives(&mut self, directives: &[Directive]) {
        for directive in directives {
            let name = directive.name.as_str();
            if name != "skip" && name != "include" {
                self.report(
                    format!("Unknown directive \"@{}\".", name),
                    directive.position,
                );
                continue;
            }

            let mut condition = None;
            for (arg_name, value) in &directive.arguments {
                if arg_name == "if" {
                    condition = Some(value);
                } else {
                    self.report(
                        format!(
                            "Unknown argument \"{}\" on directive \"@{}\".",
                            arg_name, name
                        ),
                        directive.position,
                    );
                }
            }

            match condition {
                None => self.report(
                    format!(
                        "Directive \"@{}\" argument \"if\" of type \"Boolean!\" is required, but it was not provided.",
                        name
                    ),
                    directive.position,
                ),
                Some(Value::Boolean(_)) | Some(Value::Variable(_)) => {}
                Some(other) => self.report(
                    format!("Boolean cannot represent a non boolean value: {}", other),
                    directive.position,
                ),
            }
        }
    }
}

fn collect_directive_variables<'a>(directive: &'a Directive, used: &mut Vec<(&'a str, Pos)>) {
    for (_, value) in &directive.arguments {
        value.for_each_variable(&mut |name| used.push((name, directive.position)));
    }
}

fn collect_spread_names<'a>(selection_set: &'a SelectionSet, names: &mut HashSet<&'a str>) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => collect_spread_names(&field.selection_set, names),
            Selection::FragmentSpread(spread) => {
                names.insert(spread.fragment_name.as_str());
            }
            Selection::InlineFragment(inline) => collect_spread_names(&inline.selection_set, names),
        }
    }
}
