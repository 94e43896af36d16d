use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::Xxh3;

use crate::ast::operation::{OperationDefinition, VariableDefinition};
use crate::ast::selection_set::{FieldSelection, SelectionSet};
use crate::ast::type_node::TypeNode;
use crate::ast::value::Value;

/// Order-dependent hashing
pub trait ASTHash {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H);
}

/// Hash of everything that influences planning. Ids and flags are derived
/// from the shape, so they are left out.
pub fn operation_shape_hash(operation: &OperationDefinition) -> u64 {
    let mut hasher = Xxh3::new();
    operation.ast_hash(&mut hasher);
    hasher.finish()
}

impl ASTHash for OperationDefinition {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.operation_kind.hash(hasher);
        self.variable_definitions.ast_hash(hasher);
        self.selection_set.ast_hash(hasher);
    }
}

impl<T: ASTHash> ASTHash for Vec<T> {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.len().hash(hasher);
        for item in self {
            item.ast_hash(hasher);
        }
    }
}

impl<T: ASTHash> ASTHash for Option<T> {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            None => false.hash(hasher),
            Some(t) => {
                true.hash(hasher);
                t.ast_hash(hasher);
            }
        }
    }
}

impl ASTHash for VariableDefinition {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
        self.variable_type.ast_hash(hasher);
        self.default_value.ast_hash(hasher);
    }
}

impl ASTHash for TypeNode {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.hash(hasher);
    }
}

impl ASTHash for SelectionSet {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.type_name.hash(hasher);
        self.items.ast_hash(hasher);
    }
}

impl ASTHash for FieldSelection {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
        self.alias.hash(hasher);
        self.arguments.len().hash(hasher);
        for (name, value) in &self.arguments {
            name.hash(hasher);
            value.ast_hash(hasher);
        }
        self.selection_set.ast_hash(hasher);
    }
}

impl ASTHash for Value {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        std::mem::discriminant(self).hash(hasher);
        match self {
            Value::Variable(name) => name.hash(hasher),
            Value::Int(v) => v.hash(hasher),
            Value::Float(v) => v.to_bits().hash(hasher),
            Value::String(v) => v.hash(hasher),
            Value::Boolean(v) => v.hash(hasher),
            Value::Null => {}
            Value::Enum(v) => v.hash(hasher),
            Value::List(items) => items.ast_hash(hasher),
            Value::Object(fields) => {
                fields.len().hash(hasher);
                for (name, value) in fields {
                    name.hash(hasher);
                    value.ast_hash(hasher);
                }
            }
        }
    }
}
