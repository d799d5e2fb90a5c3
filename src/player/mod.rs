pub mod controller;
pub mod process;
pub mod protocol;
pub mod seek;
pub mod state;

pub use controller::*;
pub use process::*;
pub use protocol::*;
pub use seek::*;
pub use state::*;
