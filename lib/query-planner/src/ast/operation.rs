use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};

use serde::Serialize;

use crate::ast::hash::operation_shape_hash;
use crate::ast::selection_set::{FieldSelection, SelectionId, SelectionSet, SelectionSetId};
use crate::ast::type_node::TypeNode;
use crate::ast::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// A validated operation with every field type resolved against the federation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub operation_kind: OperationKind,
    pub variable_definitions: Vec<VariableDefinition>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDefinition {
    pub name: String,
    pub variable_type: TypeNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl OperationDefinition {
    pub fn hash(&self) -> u64 {
        operation_shape_hash(self)
    }

    pub fn variable_definition(&self, name: &str) -> Option<&VariableDefinition> {
        self.variable_definitions.iter().find(|v| v.name == name)
    }

    pub fn selection_set_by_id(&self, id: SelectionSetId) -> Option<&SelectionSet> {
        self.selection_set.find_selection_set(id)
    }

    pub fn field_by_id(&self, id: SelectionId) -> Option<&FieldSelection> {
        self.selection_set.find_field(id)
    }
}

impl Display for VariableDefinition {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        write!(f, "${}: {}", self.name, self.variable_type)?;
        if let Some(default_value) = &self.default_value {
            write!(f, " = {}", default_value)?;
        }
        Ok(())
    }
}

impl Display for OperationDefinition {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        write!(f, "{}", self.operation_kind)?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if !self.variable_definitions.is_empty() {
            write!(f, "(")?;
            for (i, definition) in self.variable_definitions.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", definition)?;
            }
            write!(f, ")")?;
        }
        write!(f, " {}", self.selection_set)
    }
}
