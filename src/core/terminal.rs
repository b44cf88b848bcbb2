//! Terminal mode acquisition and restoration

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Entering and leaving the dashboard's terminal mode
pub trait TerminalMode {
    fn enter(&mut self) -> io::Result<()>;
    fn leave(&mut self) -> io::Result<()>;
}

/// Raw mode, alternate screen and hidden cursor via crossterm
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn enter(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::cursor::Hide,
        )
    }

    fn leave(&mut self) -> io::Result<()> {
        let raw = crossterm::terminal::disable_raw_mode();
        let screen = crossterm::execute!(
            io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show,
        );
        raw.and(screen)
    }
}

/// Holds the terminal in dashboard mode until restored or dropped.
///
/// Restoration happens at most once no matter how many paths (quit key,
/// signal, error, drop, panic hook) reach it.
pub struct TerminalGuard<M: TerminalMode> {
    mode: M,
    active: Arc<AtomicBool>,
}

impl<M: TerminalMode> TerminalGuard<M> {
    pub fn acquire(mut mode: M) -> io::Result<Self> {
        if let Err(e) = mode.enter() {
            // partially entered: undo whatever did succeed
            let _ = mode.leave();
            return Err(e);
        }
        Ok(Self {
            mode,
            active: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Shared flag for out-of-band restorers such as the panic hook
    pub fn active_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!("restoring terminal mode");
            self.mode.leave()
        } else {
            Ok(())
        }
    }
}

impl<M: TerminalMode> Drop for TerminalGuard<M> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Restore the terminal before the default panic message is printed.
///
/// A panicking poller is left to the render loop, which stops the other
/// poller before restoring. That only holds while panics unwind.
pub fn install_panic_hook(active: Arc<AtomicBool>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if cfg!(panic = "unwind") && crate::pollers::in_poller_task() {
            tracing::error!(panic = %info, "poller task panicked");
            return;
        }
        if active.swap(false, Ordering::SeqCst) {
            let _ = CrosstermMode.leave();
        }
        previous(info);
    }));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Records how often the mode was entered and left
    #[derive(Clone, Default)]
    pub(crate) struct CountingMode {
        pub(crate) entered: Arc<AtomicUsize>,
        pub(crate) left: Arc<AtomicUsize>,
        pub(crate) fail_enter: bool,
    }

    impl TerminalMode for CountingMode {
        fn enter(&mut self) -> io::Result<()> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            if self.fail_enter {
                return Err(io::Error::new(io::ErrorKind::Other, "not a tty"));
            }
            Ok(())
        }

        fn leave(&mut self) -> io::Result<()> {
            self.left.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_restore_is_idempotent() {
        let mode = CountingMode::default();
        let left = Arc::clone(&mode.left);

        let mut guard = TerminalGuard::acquire(mode).unwrap();
        assert!(guard.is_active());
        guard.restore().unwrap();
        guard.restore().unwrap();
        drop(guard);

        assert_eq!(left.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_restores_once() {
        let mode = CountingMode::default();
        let entered = Arc::clone(&mode.entered);
        let left = Arc::clone(&mode.left);

        drop(TerminalGuard::acquire(mode).unwrap());

        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(left.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_out_of_band_restore_wins_the_flag() {
        let mode = CountingMode::default();
        let left = Arc::clone(&mode.left);
        let mut guard = TerminalGuard::acquire(mode).unwrap();

        // what the panic hook does before the guard gets a chance
        let flag = guard.active_flag();
        assert!(flag.swap(false, Ordering::SeqCst));

        guard.restore().unwrap();
        drop(guard);
        assert_eq!(left.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_enter_rolls_back() {
        let mode = CountingMode {
            fail_enter: true,
            ..Default::default()
        };
        let left = Arc::clone(&mode.left);

        assert!(TerminalGuard::acquire(mode).is_err());
        assert_eq!(left.load(Ordering::SeqCst), 1);
    }
}
