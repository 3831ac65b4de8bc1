pub mod aws;
pub mod cluster;
pub mod dns;
pub mod render;
pub mod s3;
