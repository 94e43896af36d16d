use bitflags::bitflags;

bitflags! {
    /// Facts about a selected field, precomputed from the federation metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The field is known to the metadata and has an owning subgraph.
        const RESOLVABLE = 1 << 0;
        /// More than one subgraph can resolve the field.
        const SHARED = 1 << 1;
        /// At least one subgraph declares the field as external.
        const EXTERNAL = 1 << 2;
        /// The field needs other fields of its type to be fetched first.
        const REQUIRES = 1 << 3;
    }
}
