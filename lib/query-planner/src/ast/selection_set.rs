use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};

use serde::Serialize;

use crate::ast::type_node::TypeNode;
use crate::ast::value::Value;
use crate::federation_metadata::field_flags::FieldFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SelectionSetId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SelectionId(pub usize);

impl Display for SelectionSetId {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl Display for SelectionId {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// The fields requested on one object type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSet {
    pub id: SelectionSetId,
    pub type_name: String,
    pub items: Vec<FieldSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSelection {
    pub id: SelectionId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<(String, Value)>,
    pub field_type: TypeNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_set: Option<SelectionSet>,
    #[serde(skip)]
    pub flags: FieldFlags,
}

impl SelectionSet {
    pub fn new(id: SelectionSetId, type_name: impl Into<String>) -> Self {
        SelectionSet {
            id,
            type_name: type_name.into(),
            items: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find_selection_set(&self, id: SelectionSetId) -> Option<&SelectionSet> {
        if self.id == id {
            return Some(self);
        }

        self.items
            .iter()
            .filter_map(|field| field.selection_set.as_ref())
            .find_map(|child| child.find_selection_set(id))
    }

    pub fn find_selection_set_mut(&mut self, id: SelectionSetId) -> Option<&mut SelectionSet> {
        if self.id == id {
            return Some(self);
        }

        self.items
            .iter_mut()
            .filter_map(|field| field.selection_set.as_mut())
            .find_map(|child| child.find_selection_set_mut(id))
    }

    pub fn find_field(&self, id: SelectionId) -> Option<&FieldSelection> {
        for field in &self.items {
            if field.id == id {
                return Some(field);
            }
            if let Some(found) = field
                .selection_set
                .as_ref()
                .and_then(|child| child.find_field(id))
            {
                return Some(found);
            }
        }

        None
    }

    pub fn find_field_mut(&mut self, id: SelectionId) -> Option<&mut FieldSelection> {
        for field in self.items.iter_mut() {
            if field.id == id {
                return Some(field);
            }
            if let Some(found) = field
                .selection_set
                .as_mut()
                .and_then(|child| child.find_field_mut(id))
            {
                return Some(found);
            }
        }

        None
    }

    /// Collects every variable referenced by arguments in this tree, in order of appearance.
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for field in &self.items {
            for (_, value) in &field.arguments {
                value.collect_variables(out);
            }
            if let Some(child) = &field.selection_set {
                child.collect_variables(out);
            }
        }
    }
}

impl FieldSelection {
    pub fn response_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.selection_set.is_none()
    }

    pub fn is_introspection(&self) -> bool {
        self.name.starts_with("__")
    }
}

impl Display for SelectionSet {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        if self.items.is_empty() {
            // An empty set is not valid GraphQL
            return write!(f, "{{ __typename }}");
        }

        write!(f, "{{")?;
        for item in &self.items {
            write!(f, " {}", item)?;
        }
        write!(f, " }}")
    }
}

impl Display for FieldSelection {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        if let Some(alias) = &self.alias {
            write!(f, "{}: ", alias)?;
        }
        write!(f, "{}", self.name)?;

        if !self.arguments.is_empty() {
            write!(f, "(")?;
            for (i, (name, value)) in self.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, value)?;
            }
            write!(f, ")")?;
        }

        if let Some(selection_set) = &self.selection_set {
            write!(f, " {}", selection_set)?;
        }

        Ok(())
    }
}
