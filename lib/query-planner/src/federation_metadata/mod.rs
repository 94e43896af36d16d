pub mod field_flags;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::operation::OperationKind;
use crate::ast::type_node::TypeNode;
use crate::federation_metadata::field_flags::FieldFlags;

#[derive(Debug, thiserror::Error)]
pub enum FederationMetadataError {
    #[error("failed to parse federation metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static map from object type name to the facts the planner needs:
/// which subgraph owns each field, what it requires and how entities are
/// fetched back by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationMetadata {
    #[serde(default = "default_query_type")]
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_type: Option<String>,
    #[serde(default)]
    pub subgraphs: Vec<String>,
    #[serde(default)]
    pub types: IndexMap<String, ObjectTypeMetadata>,
}

fn default_query_type() -> String {
    "Query".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectTypeMetadata {
    #[serde(default)]
    pub fields: IndexMap<String, FieldMetadata>,
    /// State variables derivable from a field of this type.
    #[serde(default)]
    pub variables: Vec<StateVariableDefinition>,
    #[serde(default)]
    pub resolvers: Vec<ResolverDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(rename = "type")]
    pub field_type: TypeNode,
    pub owner: String,
    /// Other subgraphs that can resolve the field.
    #[serde(default)]
    pub subgraphs: Vec<String>,
    /// Subgraphs that declare the field as external.
    #[serde(default)]
    pub external: Vec<String>,
    /// Fields of the same type needed before this one can be resolved.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub arguments: IndexMap<String, TypeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariableDefinition {
    pub name: String,
    pub field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    Fetch,
    Batch,
}

/// An entity resolver: a root field of `subgraph` that returns the entity
/// (or a list of entities) for the given key variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverDefinition {
    pub subgraph: String,
    pub kind: ResolverKind,
    pub field: String,
    #[serde(default)]
    pub arguments: Vec<ResolverArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverArgument {
    pub name: String,
    pub variable: String,
    #[serde(rename = "type")]
    pub argument_type: TypeNode,
}

impl FederationMetadata {
    pub fn from_json(source: &str) -> Result<Self, FederationMetadataError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn get_type(&self, type_name: &str) -> Option<&ObjectTypeMetadata> {
        self.types.get(type_name)
    }

    pub fn root_type_name(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(self.query_type.as_str()),
            OperationKind::Mutation => self.mutation_type.as_deref(),
        }
    }

    pub fn has_subgraph(&self, name: &str) -> bool {
        self.subgraphs.iter().any(|s| s == name)
    }

    /// True when the named type is an object type described by the metadata
    /// (as opposed to a scalar or enum).
    pub fn is_object_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Consistency checks that have to hold before planning can start.
    pub fn validate(&self) -> Result<(), String> {
        if self.subgraphs.is_empty() {
            return Err("federation metadata declares no subgraphs".to_string());
        }

        if !self.types.contains_key(&self.query_type) {
            return Err(format!(
                "query type \"{}\" is missing from federation metadata",
                self.query_type
            ));
        }

        if let Some(mutation_type) = &self.mutation_type {
            if !self.types.contains_key(mutation_type) {
                return Err(format!(
                    "mutation type \"{}\" is missing from federation metadata",
                    mutation_type
                ));
            }
        }

        for (type_name, type_metadata) in &self.types {
            for (field_name, field) in &type_metadata.fields {
                let unknown = std::iter::once(&field.owner)
                    .chain(field.subgraphs.iter())
                    .find(|s| !self.has_subgraph(s));
                if let Some(subgraph) = unknown {
                    return Err(format!(
                        "field \"{}.{}\" references unknown subgraph \"{}\"",
                        type_name, field_name, subgraph
                    ));
                }

                if let Some(missing) = field
                    .requires
                    .iter()
                    .find(|r| !type_metadata.fields.contains_key(*r))
                {
                    return Err(format!(
                        "field \"{}.{}\" requires unknown field \"{}\"",
                        type_name, field_name, missing
                    ));
                }
            }

            for variable in &type_metadata.variables {
                if !type_metadata.fields.contains_key(&variable.field) {
                    return Err(format!(
                        "state variable \"{}\" of type \"{}\" points to unknown field \"{}\"",
                        variable.name, type_name, variable.field
                    ));
                }
            }

            for resolver in &type_metadata.resolvers {
                if !self.has_subgraph(&resolver.subgraph) {
                    return Err(format!(
                        "resolver \"{}\" of type \"{}\" references unknown subgraph \"{}\"",
                        resolver.field, type_name, resolver.subgraph
                    ));
                }
                if let Some(argument) = resolver
                    .arguments
                    .iter()
                    .find(|a| type_metadata.variable(&a.variable).is_none())
                {
                    return Err(format!(
                        "resolver \"{}\" of type \"{}\" binds undeclared variable \"{}\"",
                        resolver.field, type_name, argument.variable
                    ));
                }
            }
        }

        Ok(())
    }
}

impl ObjectTypeMetadata {
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&StateVariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_for_field(&self, field: &str) -> Option<&StateVariableDefinition> {
        self.variables.iter().find(|v| v.field == field)
    }

    /// Picks an entity resolver of `subgraph`, preferring the given kind and
    /// falling back to any other resolver of that subgraph.
    pub fn resolver(&self, subgraph: &str, preferred: ResolverKind) -> Option<&ResolverDefinition> {
        let mut candidates = self.resolvers.iter().filter(|r| r.subgraph == subgraph);
        let fallback = candidates.clone().next();

        candidates.find(|r| r.kind == preferred).or(fallback)
    }

    pub fn field_flags(&self, name: &str) -> Option<FieldFlags> {
        let field = self.fields.get(name)?;
        let mut flags = FieldFlags::RESOLVABLE;

        if !field.subgraphs.is_empty() {
            flags |= FieldFlags::SHARED;
        }
        if !field.external.is_empty() {
            flags |= FieldFlags::EXTERNAL;
        }
        if !field.requires.is_empty() {
            flags |= FieldFlags::REQUIRES;
        }

        Some(flags)
    }
}

impl FieldMetadata {
    /// True when `subgraph` can resolve the field. `flags` are the field's
    /// precomputed flags; the subgraph lists are only scanned when the
    /// `SHARED` and `EXTERNAL` bits say they can change the answer.
    pub fn is_resolvable_in(&self, flags: FieldFlags, subgraph: &str) -> bool {
        if self.owner == subgraph {
            return true;
        }
        if !flags.contains(FieldFlags::SHARED) {
            return false;
        }
        if flags.contains(FieldFlags::EXTERNAL) && self.is_external_in(subgraph) {
            return false;
        }

        self.subgraphs.iter().any(|s| s == subgraph)
    }

    pub fn is_external_in(&self, subgraph: &str) -> bool {
        self.external.iter().any(|s| s == subgraph)
    }
}
