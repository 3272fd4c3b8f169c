pub use self::parser::{
    AuthConfig, ChannelsConfig, Config, DatabaseConfig, DbType, LoggingConfig, MirrorConfig,
    SideChannelConfig, TranslationConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
