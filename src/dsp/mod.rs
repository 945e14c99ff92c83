pub mod error;
pub mod pink;
pub mod spectrum;
pub mod white;
