pub mod config;
pub mod project;

pub use config::Jsx2mpConfig;
pub use project::Jsx2mpProject;
