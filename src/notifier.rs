use std::process::Command;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::StorageMode;

/// Restarts the background service that indexes downloaded wallpapers.
pub trait DaemonControl {
    fn restart(&self, name: &str) -> Result<()>;
}

/// Terminates the daemon with `killall`; launchd brings it back up.
pub struct Killall;

impl DaemonControl for Killall {
    fn restart(&self, name: &str) -> Result<()> {
        let output = Command::new("killall").arg(name).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Permission(format!(
                "killall {} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Only legacy storage has a daemon to poke.
    NotOffered,
    Declined,
    Restarted,
}

/// Whether the restart question applies to this storage mode at all.
pub fn restart_offered(mode: StorageMode) -> bool {
    mode == StorageMode::Legacy
}

pub fn maybe_restart_daemon(
    mode: StorageMode,
    consent: bool,
    control: &dyn DaemonControl,
    name: &str,
) -> Result<RestartOutcome> {
    if !restart_offered(mode) {
        return Ok(RestartOutcome::NotOffered);
    }
    if !consent {
        info!("Leaving {} running", name);
        return Ok(RestartOutcome::Declined);
    }
    match control.restart(name) {
        Ok(()) => {
            info!("Restarted {}", name);
            Ok(RestartOutcome::Restarted)
        }
        Err(e) => {
            warn!("Could not restart {}: {}", name, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl DaemonControl for Recorder {
        fn restart(&self, name: &str) -> Result<()> {
            self.calls.borrow_mut().push(name.to_string());
            if self.fail {
                Err(Error::Permission("operation not permitted".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn recorder(fail: bool) -> Recorder {
        Recorder {
            calls: RefCell::new(Vec::new()),
            fail,
        }
    }

    #[test]
    fn test_user_mode_never_restarts() {
        let control = recorder(false);
        let outcome = maybe_restart_daemon(StorageMode::User, true, &control, "idleassetsd").unwrap();
        assert_eq!(outcome, RestartOutcome::NotOffered);
        assert!(control.calls.borrow().is_empty());
    }

    #[test]
    fn test_legacy_requires_consent() {
        let control = recorder(false);
        let outcome = maybe_restart_daemon(StorageMode::Legacy, false, &control, "idleassetsd").unwrap();
        assert_eq!(outcome, RestartOutcome::Declined);
        assert!(control.calls.borrow().is_empty());

        let outcome = maybe_restart_daemon(StorageMode::Legacy, true, &control, "idleassetsd").unwrap();
        assert_eq!(outcome, RestartOutcome::Restarted);
        assert_eq!(*control.calls.borrow(), vec!["idleassetsd".to_string()]);
    }

    #[test]
    fn test_restart_failure_is_permission_error() {
        let control = recorder(true);
        let result = maybe_restart_daemon(StorageMode::Legacy, true, &control, "idleassetsd");
        assert!(matches!(result, Err(Error::Permission(_))));
    }
}
