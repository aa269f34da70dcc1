mod holding;
mod registry;
mod symbols;

pub use holding::Holding;
pub use registry::{AmountIssue, AssetRegistry, RegistryError};
pub use symbols::SymbolTable;
