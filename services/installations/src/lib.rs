//! # Github App installations
//!
//! An HTTP service answering, for whichever Github App presents its credentials, "who has
//! installed this App, and which repositories can it see there?".
//!
//! A request carries the App ID and private key in headers. The App's installations are
//! listed with a signed App assertion; installations limited to selected repositories then
//! have their repositories listed with an installation token. Those second calls run
//! concurrently, one task per installation, and a failure in one of them only drops that
//! installation's repositories from the result.
//!
//! ## Example
//!
//! ```no_run
//! use installations::ServerConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let app = config.state()?.router();
//!
//! let listener = tokio::net::TcpListener::bind(config.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod config;
mod error;
mod render;
mod resolver;
mod server;
mod summary;

pub use aggregate::{aggregate, resolve_all};
pub use config::{ConfigError, ServerConfig};
pub use error::RequestError;
pub use render::{Format, RenderError, RenderOptions};
pub use resolver::InstallationResolver;
pub use server::{APP_ID_HEADER, AppState, FORMAT_HEADER, PRIVATE_KEY_HEADER};
pub use summary::{InstallationSummary, RepositorySummary};
