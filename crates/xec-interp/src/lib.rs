//! The interpolator: turns `(literals, values)` into a single safely-quoted
//! command string. This is the injection-safety boundary every adapter
//! relies on before handing strings to a shell (spec §4.1).

mod quote;
mod template;
mod value;

pub use quote::single_quote;
pub use template::Template;
pub use value::{AwaitedStdout, Value, canonical_json};
