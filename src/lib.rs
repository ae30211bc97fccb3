//! A private, encrypted bucket of web console assets served through
//! cloudfront. `root_stack::synth` turns a `PortalConfig` into a
//! cloudformation template and the manifest of assets to upload.

pub mod assembly;
pub mod config;
pub mod portal;
pub mod root_stack;

pub use assembly::{CloudAssembly, DEFAULT_OUT_DIR};
pub use config::{load_config, CustomDomainConfig, PortalConfig, PortalSettings, StackSettings};
pub use portal::Portal;
pub use root_stack::{synth, StackProps};
