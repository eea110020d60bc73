pub mod catalog;
pub mod check;
pub mod control;
pub mod init;
pub mod serve;
