//! Quote data access port.

use crate::domain::error::QuantscreenError;
use crate::domain::quote::Asset;

pub trait DataPort {
    /// All quotes for `symbol`, oldest first.
    fn load_asset(&self, symbol: &str) -> Result<Asset, QuantscreenError>;

    /// Symbols this source can load, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, QuantscreenError>;
}
