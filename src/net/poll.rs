//! Thin wrapper over `poll(2)`.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::error::TransportError;
use crate::net::socket::Socket;

/// What a registered descriptor is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

impl Interest {
    fn events(self) -> libc::c_short {
        match self {
            Interest::Readable => libc::POLLIN,
            Interest::Writable => libc::POLLOUT,
        }
    }
}

/// Events reported for one descriptor after [`PollSet::wait`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness(libc::c_short);

impl Readiness {
    pub fn is_readable(self) -> bool {
        self.0 & libc::POLLIN != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & libc::POLLOUT != 0
    }

    pub fn is_hung_up(self) -> bool {
        self.0 & libc::POLLHUP != 0
    }

    /// `POLLERR` or `POLLNVAL`.
    pub fn is_error(self) -> bool {
        self.0 & (libc::POLLERR | libc::POLLNVAL) != 0
    }
}

#[derive(Debug, Default)]
pub struct PollSet {
    fds: Vec<libc::pollfd>,
}

impl PollSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fds: Vec::with_capacity(capacity),
        }
    }

    /// Registers a raw descriptor and returns its slot index.
    pub fn register_fd(&mut self, fd: RawFd, interest: Interest) -> usize {
        self.fds.push(libc::pollfd {
            fd,
            events: interest.events(),
            revents: 0,
        });
        self.fds.len() - 1
    }

    pub fn register(&mut self, socket: &Socket, interest: Interest) -> usize {
        self.register_fd(socket.raw_fd(), interest)
    }

    /// Blocks until at least one descriptor is ready, or until `timeout`
    /// elapses (`None` waits forever). Retries on `EINTR`.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<usize, TransportError> {
        let timeout_ms = timeout.map_or(-1, |t| t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int);
        loop {
            // SAFETY: `fds` is a live Vec of pollfd and its length is passed with it.
            let ret = unsafe {
                libc::poll(self.fds.as_mut_ptr(), self.fds.len() as libc::nfds_t, timeout_ms)
            };
            if ret >= 0 {
                return Ok(ret as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(TransportError::Poll(err));
            }
        }
    }

    pub fn readiness(&self, index: usize) -> Readiness {
        self.fds
            .get(index)
            .map_or(Readiness::default(), |fd| Readiness(fd.revents))
    }
}

/// Waits for a single socket; a shorthand used by the blocking client.
pub fn wait_for(socket: &Socket, interest: Interest) -> Result<Readiness, TransportError> {
    let mut set = PollSet::with_capacity(1);
    let slot = set.register(socket, interest);
    set.wait(None)?;
    Ok(set.readiness(slot))
}
