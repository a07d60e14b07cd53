pub mod basis;
pub mod samples;
