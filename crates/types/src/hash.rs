use primitive_types::H256 as PrimitiveH256;

pub type H256 = PrimitiveH256;

/// Execution-layer block hash.
pub type Hash = H256;
/// Beacon block root.
pub type Root = H256;
