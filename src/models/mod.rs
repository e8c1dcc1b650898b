pub mod conversation;
pub mod enums;
pub mod kb;
pub mod log;

pub use conversation::*;
pub use kb::*;
pub use log::*;
