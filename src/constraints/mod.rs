pub mod classify;
pub mod oracle;
pub mod symmetry;

pub use classify::{SymmetryClassifier, SymmetryReport};
pub use oracle::{OracleStats, StatsSnapshot, ValidityOracle, Violation};
pub use symmetry::{
    OverrideSet, SymmetryDeriver, SymmetryFlags, SymmetryMap, SymmetryVariant, ValidatedOverrides,
};
