// Per-record processing: the product contract and the classification helpers

pub mod contract;
pub mod enrich;
