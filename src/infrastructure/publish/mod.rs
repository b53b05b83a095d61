//! Image building and tagging

mod docker;
pub mod tag;

pub use docker::DockerPublisher;
