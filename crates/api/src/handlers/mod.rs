pub mod hooks;
pub mod runs;
