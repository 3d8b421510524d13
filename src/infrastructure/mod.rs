//! Infrastructure layer - token generation, storage and the registry service

pub mod application;
pub mod logging;
pub mod storage;
pub mod token;
