pub mod error;
pub mod identity_repo;
#[cfg(test)]
pub mod memory;
