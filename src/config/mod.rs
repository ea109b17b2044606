//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::SiteConfig;
pub use site::SourceConfig;
pub use site::SourceKind;
pub use site::ACCESS_TOKEN_ENV;
