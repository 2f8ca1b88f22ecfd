mod host;
mod host_config;

pub use host::Host;
pub use host_config::HostConfig;
