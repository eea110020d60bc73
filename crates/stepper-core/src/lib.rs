pub mod action;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod goal;
pub mod io;
pub mod paths;
pub mod remote;
pub mod script;
pub mod types;

pub use error::{Result, StepperError};
