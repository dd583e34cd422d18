pub mod eks;
pub mod helm;
pub mod region;
pub mod toolchain;
