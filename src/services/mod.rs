pub mod processor;
pub mod renditions;
pub mod staging;
pub mod storage;
pub mod transform;
pub mod worker;
