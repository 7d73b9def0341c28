//! Interrupt and broken-pipe handling
//!
//! SIGINT only raises a flag (and echoes a newline so the prompt moves on).
//! The handler is installed without `SA_RESTART`, which makes a blocking
//! syscall return `EINTR`; whoever is blocked then checks [`Interrupt`] to
//! decide whether the operator asked to stop. SIGPIPE is ignored: writes
//! to a closed peer come back as `EPIPE` instead of killing the process.

use std::sync::atomic::{AtomicBool, Ordering};

use libsock::{Errno, Error};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    let newline = b"\n";
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            newline.as_ptr() as *const libc::c_void,
            newline.len(),
        );
    }
}

pub(crate) fn set_handler(sig: libc::c_int, handler: libc::sighandler_t) -> Result<(), Error> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handler;
    action.sa_flags = 0;
    unsafe { libc::sigemptyset(&mut action.sa_mask) };
    Error::from_ret(unsafe { libc::sigaction(sig, &action, std::ptr::null_mut()) }).map(|_| ())
}

/// Observer for an interrupt flag
#[derive(Debug, Clone, Copy)]
pub struct Interrupt {
    flag: &'static AtomicBool,
}

impl Interrupt {
    /// Install the SIGINT handler and ignore SIGPIPE
    pub fn install() -> Result<Interrupt, Error> {
        set_handler(libc::SIGINT, on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t)?;
        set_handler(libc::SIGPIPE, libc::SIG_IGN)?;
        Ok(Interrupt {
            flag: &INTERRUPTED,
        })
    }

    /// A flag no signal is wired to; raised only through [`Interrupt::raise`]
    pub fn detached() -> Interrupt {
        Interrupt {
            flag: Box::leak(Box::new(AtomicBool::new(false))),
        }
    }

    /// Whether an interrupt arrived since the last [`Interrupt::clear`]
    pub fn raised(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag as the signal handler would
    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// An `EINTR` that the operator caused, as opposed to a stray signal
    pub fn caused(&self, error: &Error) -> bool {
        error.is(Errno::EINTR) && self.raised()
    }
}
