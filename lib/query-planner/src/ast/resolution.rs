use std::collections::HashMap;

use graphql_parser::query::{
    self as parser, Definition, FragmentDefinition, Selection, TypeCondition,
};
use tracing::instrument;

use crate::ast::operation::{OperationDefinition, OperationKind, VariableDefinition};
use crate::ast::selection_set::{FieldSelection, SelectionId, SelectionSet, SelectionSetId};
use crate::ast::type_node::TypeNode;
use crate::ast::value::Value;
use crate::federation_metadata::field_flags::FieldFlags;
use crate::federation_metadata::FederationMetadata;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum OperationBuildError {
    #[error("failed to parse operation: {0}")]
    Parse(String),
    #[error("operation \"{0}\" was not found in the document")]
    OperationNotFound(String),
    #[error("the document contains no operation")]
    NoOperation,
    #[error("the document contains multiple operations, an operation name is required")]
    AmbiguousOperation,
    #[error("subscriptions are not supported")]
    SubscriptionUnsupported,
    #[error("the schema has no {0} root type")]
    MissingRootType(OperationKind),
    #[error("field \"{field_name}\" does not exist on type \"{type_name}\"")]
    UnknownField {
        type_name: String,
        field_name: String,
    },
    #[error("fragment \"{0}\" is not defined")]
    UnknownFragment(String),
    #[error("fragment \"{0}\" spreads itself")]
    CyclicFragment(String),
    #[error("type condition \"{condition}\" does not match object type \"{type_name}\"")]
    TypeConditionMismatch {
        condition: String,
        type_name: String,
    },
    #[error("field \"{type_name}.{field_name}\" of object type requires a selection set")]
    MissingSelectionSet {
        type_name: String,
        field_name: String,
    },
    #[error("leaf field \"{type_name}.{field_name}\" cannot have a selection set")]
    UnexpectedSelectionSet {
        type_name: String,
        field_name: String,
    },
    #[error("directive \"@{0}\" is not supported")]
    UnsupportedDirective(String),
}

/// Parses GraphQL operation text and resolves every field against the
/// federation metadata, assigning selection and selection set ids in
/// document order.
#[instrument(level = "trace", skip_all)]
pub fn build_operation(
    metadata: &FederationMetadata,
    source: &str,
    operation_name: Option<&str>,
) -> Result<OperationDefinition, OperationBuildError> {
    let document = parser::parse_query::<String>(source)
        .map_err(|e| OperationBuildError::Parse(e.to_string()))?;

    let mut fragments = HashMap::new();
    let mut operations = vec![];
    for definition in &document.definitions {
        match definition {
            Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.as_str(), fragment);
            }
            Definition::Operation(operation) => operations.push(operation),
        }
    }

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|op| parser_operation_name(op) == Some(name))
            .ok_or_else(|| OperationBuildError::OperationNotFound(name.to_string()))?,
        None => match operations.len() {
            0 => return Err(OperationBuildError::NoOperation),
            1 => operations[0],
            _ => return Err(OperationBuildError::AmbiguousOperation),
        },
    };

    let (kind, name, variable_definitions, selection_set) = match operation {
        parser::OperationDefinition::SelectionSet(selection_set) => {
            (OperationKind::Query, None, &[][..], selection_set)
        }
        parser::OperationDefinition::Query(query) => (
            OperationKind::Query,
            query.name.clone(),
            &query.variable_definitions[..],
            &query.selection_set,
        ),
        parser::OperationDefinition::Mutation(mutation) => (
            OperationKind::Mutation,
            mutation.name.clone(),
            &mutation.variable_definitions[..],
            &mutation.selection_set,
        ),
        parser::OperationDefinition::Subscription(_) => {
            return Err(OperationBuildError::SubscriptionUnsupported)
        }
    };

    let root_type = metadata
        .root_type_name(kind)
        .ok_or(OperationBuildError::MissingRootType(kind))?;

    let mut builder = OperationBuilder {
        metadata,
        fragments,
        next_selection_set_id: 0,
        next_selection_id: 0,
    };
    let selection_set = builder.build_selection_set(root_type, selection_set, &mut vec![])?;

    Ok(OperationDefinition {
        name,
        operation_kind: kind,
        variable_definitions: variable_definitions
            .iter()
            .map(|definition| VariableDefinition {
                name: definition.name.clone(),
                variable_type: TypeNode::from(&definition.var_type),
                default_value: definition.default_value.as_ref().map(Value::from),
            })
            .collect(),
        selection_set,
    })
}

fn parser_operation_name<'a>(operation: &'a parser::OperationDefinition<'_, String>) -> Option<&'a str> {
    match operation {
        parser::OperationDefinition::SelectionSet(_) => None,
        parser::OperationDefinition::Query(q) => q.name.as_deref(),
        parser::OperationDefinition::Mutation(m) => m.name.as_deref(),
        parser::OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

struct OperationBuilder<'a, 'd, 's> {
    metadata: &'a FederationMetadata,
    fragments: HashMap<&'d str, &'d FragmentDefinition<'s, String>>,
    next_selection_set_id: usize,
    next_selection_id: usize,
}

impl<'a, 'd, 's> OperationBuilder<'a, 'd, 's> {
    fn build_selection_set(
        &mut self,
        type_name: &str,
        source: &'d parser::SelectionSet<'s, String>,
        fragment_stack: &mut Vec<&'d str>,
    ) -> Result<SelectionSet, OperationBuildError> {
        let id = SelectionSetId(self.next_selection_set_id);
        self.next_selection_set_id += 1;

        let mut selection_set = SelectionSet::new(id, type_name);
        self.collect_fields(type_name, source, &mut selection_set, fragment_stack)?;

        Ok(selection_set)
    }

    fn collect_fields(
        &mut self,
        type_name: &str,
        source: &'d parser::SelectionSet<'s, String>,
        target: &mut SelectionSet,
        fragment_stack: &mut Vec<&'d str>,
    ) -> Result<(), OperationBuildError> {
        for selection in &source.items {
            match selection {
                Selection::Field(field) => {
                    if let Some(directive) = field.directives.first() {
                        return Err(OperationBuildError::UnsupportedDirective(
                            directive.name.clone(),
                        ));
                    }
                    let built = self.build_field(type_name, field, fragment_stack)?;
                    target.items.push(built);
                }
                Selection::InlineFragment(fragment) => {
                    if let Some(TypeCondition::On(condition)) = &fragment.type_condition {
                        check_type_condition(condition, type_name)?;
                    }
                    self.collect_fields(type_name, &fragment.selection_set, target, fragment_stack)?;
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment = *self
                        .fragments
                        .get(name)
                        .ok_or_else(|| OperationBuildError::UnknownFragment(name.to_string()))?;
                    if fragment_stack.contains(&name) {
                        return Err(OperationBuildError::CyclicFragment(name.to_string()));
                    }
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    check_type_condition(condition, type_name)?;

                    fragment_stack.push(name);
                    self.collect_fields(type_name, &fragment.selection_set, target, fragment_stack)?;
                    fragment_stack.pop();
                }
            }
        }

        Ok(())
    }

    fn build_field(
        &mut self,
        parent_type: &str,
        field: &'d parser::Field<'s, String>,
        fragment_stack: &mut Vec<&'d str>,
    ) -> Result<FieldSelection, OperationBuildError> {
        let id = SelectionId(self.next_selection_id);
        self.next_selection_id += 1;

        let field_type = if field.name == "__typename" {
            TypeNode::non_null(TypeNode::named("String"))
        } else {
            self.metadata
                .get_type(parent_type)
                .and_then(|t| t.field(&field.name))
                .map(|f| f.field_type.clone())
                .ok_or_else(|| OperationBuildError::UnknownField {
                    type_name: parent_type.to_string(),
                    field_name: field.name.clone(),
                })?
        };

        let inner_type = field_type.inner_type().to_string();
        let selection_set = if self.metadata.is_object_type(&inner_type) {
            if field.selection_set.items.is_empty() {
                return Err(OperationBuildError::MissingSelectionSet {
                    type_name: parent_type.to_string(),
                    field_name: field.name.clone(),
                });
            }
            Some(self.build_selection_set(&inner_type, &field.selection_set, fragment_stack)?)
        } else {
            if !field.selection_set.items.is_empty() {
                return Err(OperationBuildError::UnexpectedSelectionSet {
                    type_name: parent_type.to_string(),
                    field_name: field.name.clone(),
                });
            }
            None
        };

        Ok(FieldSelection {
            id,
            name: field.name.clone(),
            alias: field.alias.clone(),
            arguments: field
                .arguments
                .iter()
                .map(|(name, value)| (name.clone(), Value::from(value)))
                .collect(),
            field_type,
            selection_set,
            flags: FieldFlags::empty(),
        })
    }
}

fn check_type_condition(condition: &str, type_name: &str) -> Result<(), OperationBuildError> {
    if condition != type_name {
        return Err(OperationBuildError::TypeConditionMismatch {
            condition: condition.to_string(),
            type_name: type_name.to_string(),
        });
    }

    Ok(())
}
