//! Byte transport to the bridge.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use log::debug;

/// How long to wait before retrying a read or write that would block.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

const READ_LEN: usize = 256;

/// Line speed the bridge firmware runs at.
pub const DEFAULT_BAUD: u32 = 57600;

pub trait Transport {
    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read exactly `count` bytes, blocking until they arrive.
    fn read_exact(&mut self, count: usize) -> io::Result<Vec<u8>>;

    /// Write all of `bytes`, blocking until done.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// A serial device, opened in non-blocking mode and set to raw 8N1 at the
/// requested baud rate.
pub struct SerialTransport {
    path: PathBuf,
    port: File,
    buffer: VecDeque<u8>,
}

impl SerialTransport {
    pub fn open(path: &Path, baud: u32) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY);
        }
        let port = options.open(path)?;
        configure(&port, baud)?;
        debug!("Opened {} at {baud} baud", path.display());
        Ok(SerialTransport {
            path: path.to_path_buf(),
            port,
            buffer: VecDeque::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move everything the device has into the buffer.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_LEN];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("{} closed", self.path.display()))),
                Ok(count) => self.buffer.extend(&chunk[..count]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(unix)]
fn speed(baud: u32) -> io::Result<libc::speed_t> {
    Ok(match baud {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("unsupported baud rate {baud}"))),
    })
}

/// Raw 8N1 at `baud`. Reads never wait.
#[cfg(unix)]
fn configure(port: &File, baud: u32) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = port.as_raw_fd();
    let speed = speed(baud)?;
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    unsafe { libc::cfmakeraw(&mut termios) };
    termios.c_cflag |= libc::CLOCAL | libc::CREAD;
    termios.c_cflag &= !(libc::CSTOPB | libc::CRTSCTS);
    termios.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 0;
    if unsafe { libc::cfsetspeed(&mut termios, speed) } != 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure(_port: &File, _baud: u32) -> io::Result<()> {
    Err(io::Error::new(
        ErrorKind::Unsupported,
        "serial line setup is only implemented for unix"))
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.fill()?;
        Ok(self.buffer.len())
    }

    fn read_exact(&mut self, count: usize) -> io::Result<Vec<u8>> {
        while self.buffer.len() < count {
            self.fill()?;
            if self.buffer.len() < count {
                sleep(POLL_INTERVAL);
            }
        }
        Ok(self.buffer.drain(..count).collect())
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            match self.port.write(bytes) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(count) => bytes = &bytes[count..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => sleep(POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        }
        self.port.flush()
    }
}
