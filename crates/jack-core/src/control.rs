// Virtual Jack Control Endpoints
// Named pipes standing in for writable sysfs attribute files

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Permission bits for control pipes (owner read/write, group write)
const FIFO_MODE: libc::mode_t = 0o620;

/// A writable control file backed by a FIFO.
///
/// The FIFO is held open read-write so it never reports EOF when a
/// writer like `echo` closes its end.
#[derive(Debug)]
pub struct ControlFifo {
    path: PathBuf,
    file: File,
}

impl ControlFifo {
    /// Create the FIFO at `path`, replacing a stale one left by a previous run.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match std::fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_fifo() => std::fs::remove_file(&path)?,
            Ok(_) => {
                return Err(io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} exists and is not a FIFO", path.display()),
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read everything currently buffered in the pipe.
    pub fn read_pending(&mut self) -> io::Result<String> {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Close the pipe and unlink it.
    pub fn remove(self) -> io::Result<()> {
        let Self { path, file } = self;
        drop(file);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl AsRawFd for ControlFifo {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Wait until any of `fds` is readable.
///
/// Returns the indices of readable descriptors. A timeout or EINTR yields an
/// empty list so the caller can re-check its running flag.
pub fn poll_readable(fds: &[RawFd], timeout_ms: i32) -> io::Result<Vec<usize>> {
    let mut poll_fds: Vec<libc::pollfd> = fds
        .iter()
        .map(|fd| libc::pollfd {
            fd: *fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let poll_result = unsafe {
        libc::poll(
            poll_fds.as_mut_ptr(),
            poll_fds.len() as libc::nfds_t,
            timeout_ms,
        )
    };

    if poll_result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(Vec::new());
        }
        return Err(err);
    }

    Ok(poll_fds
        .iter()
        .enumerate()
        .filter(|(_, pfd)| pfd.revents & libc::POLLIN != 0)
        .map(|(i, _)| i)
        .collect())
}

/// Split data read from a control pipe into individual writes.
///
/// A sysfs store sees one `write(2)` at a time, but several `echo`s can
/// pile up in a pipe between polls. Each line is treated as one write.
pub fn split_writes(data: &str) -> Vec<&str> {
    data.split_terminator('\n').collect()
}
