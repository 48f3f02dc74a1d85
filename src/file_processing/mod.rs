pub mod analyzer;
pub mod naming;
pub mod validator;

pub use analyzer::extract_extension;
pub use naming::NameGenerator;
pub use validator::ExtensionPolicy;
