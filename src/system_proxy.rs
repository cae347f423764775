use log::info;

use crate::error::Result;

/// Sink for the OS proxy-auto-config registration.
///
/// The orchestrator hands the responder's URL to `set_pac_url` when serving
/// starts and an empty string to clear the registration on shutdown.
/// Platform integrations (WinInet on Windows, `networksetup` on macOS,
/// gsettings on GNOME) plug in behind this trait.
pub trait SystemProxy {
    fn set_pac_url(&self, pac_url: &str) -> Result<()>;
}

/// Registration sink that only records the request in the log. Used when no
/// platform integration is wired in; the OS keeps whatever proxy settings it
/// already has.
pub struct LoggingSystemProxy;

impl SystemProxy for LoggingSystemProxy {
    fn set_pac_url(&self, pac_url: &str) -> Result<()> {
        if pac_url.is_empty() {
            info!("System proxy auto-config registration cleared");
        } else {
            info!("System proxy auto-config URL set to {}", pac_url);
        }
        Ok(())
    }
}
