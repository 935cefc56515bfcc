use std::io;

use thiserror::Error;
use url::Url;

/// Errors raised while opening the default browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The platform launcher could not be started or reported failure.
    #[error("failed to open {url} in the default browser: {source}")]
    Launch {
        /// Target URL.
        url: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Fire-and-forget request to show a URL in the user's browser.
pub trait BrowserOpener: Send + Sync {
    /// Opens `url`.
    fn open(&self, url: &Url) -> Result<(), BrowserError>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), BrowserError> {
        open::that(url.as_str()).map_err(|source| BrowserError::Launch {
            url: url.to_string(),
            source,
        })
    }
}
