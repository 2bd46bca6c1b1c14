pub mod alias;

pub use alias::{Alias, AliasModel, BackendKind};
