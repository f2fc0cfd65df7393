mod currency;
mod minor_units;

pub mod helpers;
pub mod op;
mod secret;

pub use currency::{Currency, CurrencyError};
pub use minor_units::{MinorUnits, MinorUnitsConversionError};
pub use secret::{secret_string, Secret};
