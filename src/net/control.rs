//! Control channel: a pipe whose read end sits in the server's poll set.
//!
//! Other threads post NUL-terminated commands into the write end; the
//! server worker is the only reader.

use std::io;
use std::os::fd::{FromRawFd, OwnedFd};

use crate::error::TransportError;
use crate::net::socket::{IoOps, Socket};

/// Command that ends the server loop.
pub const STOP: &str = "stop";

pub fn channel() -> Result<(ControlSender, ControlReceiver), TransportError> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(TransportError::socket("create pipe for", io::Error::last_os_error()));
    }
    // SAFETY: pipe(2) just returned two fresh descriptors.
    let (read_end, write_end) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    Ok((
        ControlSender {
            socket: Socket::from_fd(write_end, IoOps::PLAIN)?,
        },
        ControlReceiver {
            socket: Socket::from_fd(read_end, IoOps::PLAIN)?,
        },
    ))
}

#[derive(Debug)]
pub struct ControlSender {
    socket: Socket,
}

impl ControlSender {
    pub fn send(&self, command: &str) -> Result<(), TransportError> {
        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(0);

        let sent = self.socket.write(&frame)?;
        if sent < frame.len() {
            return Err(TransportError::socket("write to", io::ErrorKind::WouldBlock.into()));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ControlReceiver {
    socket: Socket,
}

impl ControlReceiver {
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Reads whatever is pending and returns every complete command.
    pub fn drain(&mut self) -> Result<Vec<String>, TransportError> {
        self.socket.read()?;

        let stream = self.socket.stream_mut();
        let mut commands = Vec::new();
        while let Some(end) = stream.find(b"\0") {
            commands.push(String::from_utf8_lossy(stream.take(end)).into_owned());
            stream.skip(1);
        }
        stream.realign();
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_split_on_nul() {
        let (tx, mut rx) = channel().unwrap();
        tx.send("ping").unwrap();
        tx.send(STOP).unwrap();
        assert_eq!(rx.drain().unwrap(), vec!["ping".to_string(), "stop".to_string()]);
        assert!(rx.drain().unwrap().is_empty());
    }
}
