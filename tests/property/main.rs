// tests/property/main.rs

mod readiness;
mod sequence;
mod validator;

pub const PROJECT: &str = "proj-1";
