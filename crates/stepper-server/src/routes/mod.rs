pub mod control;
pub mod discovery;
