mod dns;
mod ecs;
mod s3;

pub use dns::DnsArgs;
pub use ecs::EcsArgs;
pub use s3::S3Args;
