// Utils module - common code that calls outside of other modules
pub mod exec;
