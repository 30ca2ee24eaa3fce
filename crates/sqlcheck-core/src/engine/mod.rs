pub mod runner;

pub use runner::{RunPolicy, Runner, SuiteSession, SuiteState};
