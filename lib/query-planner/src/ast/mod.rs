pub mod hash;
pub mod operation;
pub mod resolution;
pub mod selection_set;
pub mod type_node;
pub mod value;
