//! Non-blocking file-descriptor wrapper.
//!
//! The same [`Socket`] drives Unix stream sockets (`recv`/`send`) and plain
//! pipe descriptors (`read`/`write`); the syscall pair is injected as an
//! [`IoOps`] value at construction.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::TransportError;
use crate::http::stream::{ByteStream, DEFAULT_CAPACITY};

/// Pending-connection queue length passed to `listen(2)`.
pub const LISTEN_BACKLOG: libc::c_int = 16;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;

pub type ReadFn = fn(RawFd, &mut [u8]) -> io::Result<usize>;
pub type WriteFn = fn(RawFd, &[u8]) -> io::Result<usize>;

/// The read/write syscall pair a [`Socket`] uses for data transfer.
#[derive(Clone, Copy)]
pub struct IoOps {
    pub read: ReadFn,
    pub write: WriteFn,
}

impl IoOps {
    /// `recv(2)` / `send(2)`, for connected sockets.
    pub const NETWORK: IoOps = IoOps {
        read: network_read,
        write: network_write,
    };

    /// `read(2)` / `write(2)`, for pipes and other byte-stream fds.
    pub const PLAIN: IoOps = IoOps {
        read: plain_read,
        write: plain_write,
    };
}

impl std::fmt::Debug for IoOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IoOps")
    }
}

fn cvt(ret: isize) -> io::Result<usize> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

fn cvt_int(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

// SAFETY (the four transfer functions): `buf` is a live slice and the
// length passed is exactly its length; an invalid `fd` only yields EBADF.
fn network_read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    cvt(unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), buf.len(), 0) })
}

fn network_write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    cvt(unsafe { libc::send(fd, buf.as_ptr().cast(), buf.len(), SEND_FLAGS) })
}

fn plain_read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    cvt(unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) })
}

fn plain_write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    cvt(unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) })
}

fn unix_addr(path: &Path) -> Result<(libc::sockaddr_un, libc::socklen_t), TransportError> {
    let bytes = path.as_os_str().as_bytes();
    // SAFETY: sockaddr_un is plain old data; all-zero is a valid value.
    let mut addr: libc::sockaddr_un = unsafe { mem::zeroed() };
    if bytes.len() >= addr.sun_path.len() {
        return Err(TransportError::PathTooLong(path.display().to_string()));
    }

    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }
    let len = mem::offset_of!(libc::sockaddr_un, sun_path) + bytes.len() + 1;
    Ok((addr, len as libc::socklen_t))
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: F_GETFL/F_SETFL take no pointer arguments.
    let flags = cvt_int(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
    cvt_int(unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) })?;
    Ok(())
}

#[derive(Debug)]
pub struct Socket {
    fd: Option<OwnedFd>,
    io: IoOps,
    stream: ByteStream,
    peer_closed: bool,
}

impl Socket {
    /// A fresh, unconnected Unix stream socket.
    pub fn new() -> Result<Self, TransportError> {
        // SAFETY: socket(2) has no pointer arguments.
        let fd = cvt_int(unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM, 0) })
            .map_err(|e| TransportError::socket("create", e))?;
        // SAFETY: `fd` was just returned by socket(2) and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Self::from_fd(fd, IoOps::NETWORK)
    }

    /// Takes ownership of `fd` and switches it to non-blocking mode.
    pub fn from_fd(fd: OwnedFd, io: IoOps) -> Result<Self, TransportError> {
        set_nonblocking(fd.as_raw_fd()).map_err(|e| TransportError::socket("configure", e))?;
        Ok(Self {
            fd: Some(fd),
            io,
            stream: ByteStream::new(DEFAULT_CAPACITY),
            peer_closed: false,
        })
    }

    /// Raw descriptor, or `-1` once closed (`poll(2)` ignores negative fds).
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    /// Whether a read has seen end-of-file.
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    pub fn is_listening(&self) -> bool {
        let Some(fd) = &self.fd else {
            return false;
        };
        let mut value: libc::c_int = 0;
        let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
        // SAFETY: `value` and `len` outlive the call and `len` is its size.
        let ret = unsafe {
            libc::getsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_ACCEPTCONN,
                (&mut value as *mut libc::c_int).cast(),
                &mut len,
            )
        };
        ret == 0 && value > 0
    }

    fn open_fd(&self, op: &'static str) -> Result<RawFd, TransportError> {
        self.fd
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| TransportError::socket(op, io::ErrorKind::NotConnected.into()))
    }

    pub fn connect(&self, path: &Path) -> Result<(), TransportError> {
        let fd = self.open_fd("connect")?;
        let (addr, len) = unix_addr(path)?;
        // SAFETY: `addr` is a valid sockaddr_un and `len` does not exceed it.
        cvt_int(unsafe { libc::connect(fd, (&addr as *const libc::sockaddr_un).cast(), len) })
            .map_err(|e| TransportError::socket("connect", e))?;
        Ok(())
    }

    /// Binds to `path` and starts listening.
    pub fn listen(&self, path: &Path) -> Result<(), TransportError> {
        let fd = self.open_fd("bind")?;
        let (addr, len) = unix_addr(path)?;
        // SAFETY: as in `connect`.
        cvt_int(unsafe { libc::bind(fd, (&addr as *const libc::sockaddr_un).cast(), len) })
            .map_err(|e| TransportError::socket("bind", e))?;
        // SAFETY: no pointer arguments.
        cvt_int(unsafe { libc::listen(fd, LISTEN_BACKLOG) })
            .map_err(|e| TransportError::socket("listen", e))?;
        Ok(())
    }

    /// Accepts one pending connection; `None` when there is none right now.
    pub fn accept(&self) -> Result<Option<Socket>, TransportError> {
        let fd = self.open_fd("accept")?;
        loop {
            // SAFETY: null address pointers ask accept(2) not to report the peer.
            let ret = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
            match cvt_int(ret) {
                Ok(client) => {
                    // SAFETY: accept(2) handed us a new descriptor nobody else owns.
                    let client = unsafe { OwnedFd::from_raw_fd(client) };
                    return Socket::from_fd(client, IoOps::NETWORK).map(Some);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(TransportError::socket("accept", e)),
            }
        }
    }

    /// Drains the descriptor into the stream until would-block, end-of-file
    /// or a full buffer. Returns the number of bytes read.
    pub fn read(&mut self) -> Result<usize, TransportError> {
        let fd = self.open_fd("read from")?;
        let mut total = 0;
        while self.stream.writable_size() > 0 {
            match (self.io.read)(fd, self.stream.writable_buffer()) {
                Ok(0) => {
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => {
                    self.stream.advance_written(n);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::socket("read from", e)),
            }
        }
        Ok(total)
    }

    /// Sends until everything is out or the socket would block.
    ///
    /// Returns how many bytes were sent; anything short of `data.len()`
    /// must be retried once the socket is writable again.
    pub fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let fd = self.open_fd("write to")?;
        let mut sent = 0;
        while sent < data.len() {
            match (self.io.write)(fd, &data[sent..]) {
                Ok(0) => break,
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::socket("write to", e)),
            }
        }
        Ok(sent)
    }

    /// Shuts down and closes the descriptor. Idempotent.
    pub fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            // SAFETY: `fd` is still owned here; it is closed when dropped below.
            // Fails with ENOTSOCK on pipes, which is fine.
            unsafe { libc::shutdown(fd.as_raw_fd(), libc::SHUT_RDWR) };
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}
