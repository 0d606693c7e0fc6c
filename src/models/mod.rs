mod intent;
mod ledger;
mod user;

pub use intent::*;
pub use ledger::*;
pub use user::*;
