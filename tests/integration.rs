#[path = "integration/incomplete_input.rs"]
mod incomplete_input;
#[path = "integration/loader.rs"]
mod loader;
#[path = "integration/parity.rs"]
mod parity;
