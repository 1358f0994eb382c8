pub mod demo;
pub mod list;
pub mod resolve;
pub mod run;

pub use demo::*;
pub use list::*;
pub use resolve::*;
pub use run::*;
