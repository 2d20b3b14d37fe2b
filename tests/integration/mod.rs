mod config_integration;
pub mod test_utils;
