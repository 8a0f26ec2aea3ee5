//! Rule contexts and the JSON expression language evaluated against them.

mod eval;
mod host;
mod operator;
mod store;
mod value;

pub use eval::{EvalError, MAX_DIE_COUNT, MAX_DIE_SIDES};
pub use host::{roll_dice, Dice, Host};
pub use operator::Operator;
pub use store::{Context, ContextRef};
pub use value::{Value, ValueMap};
