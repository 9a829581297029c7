pub mod check;
pub mod init;
pub mod run;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use run::{run, RunArgs};
