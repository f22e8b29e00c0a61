pub mod audit;
pub mod benchmark;
pub mod errors;
pub mod ids;
pub mod practice;
pub mod provider;
pub mod session;
