pub mod alert;
pub mod response;
pub mod scoring;
pub mod topology;
pub mod worker;
