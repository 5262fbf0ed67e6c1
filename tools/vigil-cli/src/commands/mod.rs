pub mod check;
pub mod cleanup;
pub mod init;
pub mod run;
pub mod stats;
