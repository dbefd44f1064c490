//! # tabula-types: Scalars and records for tabula
//!
//! Every layer of the engine speaks in these two types:
//!
//! - [`Value`]: the scalar stored in a field (number, boolean, text, null)
//! - [`Record`]: an insertion-ordered mapping from field name to [`Value`]
//!
//! Numbers are `f64` throughout. Comparisons come in two flavours:
//! [`Value::loose_eq`] for coercing equality and [`Value::compare`] for
//! ordering.

mod record;
mod value;


pub use record::Record;
pub use value::{format_number, parse_numeral, DataType, Value};
