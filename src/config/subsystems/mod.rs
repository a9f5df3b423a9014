pub mod algorithm;
pub mod manager;

pub use algorithm::AlgorithmConfig;
pub use manager::ManagerConfig;
