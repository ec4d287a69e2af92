pub mod config;
pub mod gate;
pub mod network;
pub mod storage;
