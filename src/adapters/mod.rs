// Adapters - External system implementations

pub mod exec_libav;
pub mod fs_local;
pub mod probe_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_libav::EncodeLibavAdapter;
pub use fs_local::FsLocalAdapter;
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;
