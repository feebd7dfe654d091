pub mod storage;
pub mod sql;
pub mod catalog;
pub mod execution;
pub mod engine;
pub mod error;
