//! Command plumbing shared by every CLI operation

use std::fmt::Display;

use flickrfs_daemon::AppConfig;

/// Everything an operation may need from the invocation
#[derive(Debug, Clone)]
pub struct OpContext {
    pub config: AppConfig,
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: Display + Send;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Generate a `Command` subcommand enum over a list of operations, plus the
/// `OpOutput` and `OpError` enums its `Op` impl returns.
///
/// Each entry may carry `#[cfg(...)]` attributes.
#[macro_export]
macro_rules! command_enum {
    ($($(#[$attr:meta])* ($variant:ident, $ty:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($(#[$attr])* $variant($ty),)*
        }

        pub enum OpOutput {
            $($(#[$attr])* $variant(<$ty as $crate::cli::op::Op>::Output),)*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($(#[$attr])* OpOutput::$variant(output) => write!(f, "{}", output),)*
                }
            }
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $($(#[$attr])* #[error(transparent)] $variant(<$ty as $crate::cli::op::Op>::Error),)*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $($(#[$attr])* Command::$variant(op) => op
                        .execute(ctx)
                        .await
                        .map(OpOutput::$variant)
                        .map_err(OpError::$variant),)*
                }
            }
        }
    };
}
