pub mod bootstrap;
pub mod check;
pub mod serve;

pub use bootstrap::transport_registry;
pub use check::{execute_check_command, CheckArgs};
pub use serve::{execute_serve_command, ServeArgs};
