use std::time::Duration;

use crate::agent::error::DriverError;
use crate::screen::screen_model::Snapshot;

/// The automation surface the controllers act on.
///
/// Every call blocks until it completes or its timeout elapses; a timeout
/// is reported as an error, never retried here.
pub trait AutomationDriver {
    fn load_surface(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    fn content_snapshot(&mut self) -> Result<Snapshot, DriverError>;

    fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Block until `target` (visible text or a selector) is shown.
    fn wait_for_visible(&mut self, target: &str, timeout: Duration) -> Result<(), DriverError>;

    fn current_url(&mut self) -> Result<String, DriverError>;

    /// Give the surface a moment to react after an action.
    fn settle(&mut self, _pause: Duration) -> Result<(), DriverError> {
        Ok(())
    }
}

impl<D: AutomationDriver + ?Sized> AutomationDriver for Box<D> {
    fn load_surface(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        (**self).load_surface(url, timeout)
    }

    fn content_snapshot(&mut self) -> Result<Snapshot, DriverError> {
        (**self).content_snapshot()
    }

    fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        (**self).click(selector, timeout)
    }

    fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> Result<(), DriverError> {
        (**self).fill(selector, value, timeout)
    }

    fn wait_for_visible(&mut self, target: &str, timeout: Duration) -> Result<(), DriverError> {
        (**self).wait_for_visible(target, timeout)
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        (**self).current_url()
    }

    fn settle(&mut self, pause: Duration) -> Result<(), DriverError> {
        (**self).settle(pause)
    }
}
