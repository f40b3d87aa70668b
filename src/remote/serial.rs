//! Serial transport seam shared by every rig driver (§4.6, §5 "Remote-base
//! serial I/O suspends in blocking reads with an explicit timeout per rig").
//! Rig drivers are generic over `SerialIo` so their framing logic is
//! testable without an attached radio; `serialport` is the standard
//! host-serial crate and fills in for the teacher's `spidev`/`sysfs_gpio`
//! hardware-IO crates, which have no host-serial equivalent.

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{RptError, Result};

/// Blocking byte-level I/O with a per-call timeout, the seam rig drivers
/// are generic over.
pub trait SerialIo: Send {
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;
    /// Read up to and including `terminator`, or timeout. Used by the
    /// ASCII `;`/space/`\n`-terminated rigs (ft950, kenwood family).
    fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>>;
    fn sleep(&self, dur: Duration);
}

/// `serialport`-backed implementation (§4.6 uses `ioport`/`iospeed` from the
/// node's config section to open this).
pub struct HostSerial {
    port: Box<dyn serialport::SerialPort>,
}

impl HostSerial {
    pub fn open(path: &str, baud: u32) -> Result<HostSerial> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| RptError::io("serial open", std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(HostSerial { port })
    }
}

impl SerialIo for HostSerial {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf).map_err(|e| RptError::io("serial write", e))
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| RptError::io("serial set_timeout", std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.port.read_exact(buf).map_err(|e| RptError::io("serial read_exact", e))
    }

    fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| RptError::io("serial set_timeout", std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            self.port.read_exact(&mut byte).map_err(|e| RptError::io("serial read_until", e))?;
            if byte[0] == terminator {
                break;
            }
            out.push(byte[0]);
        }
        Ok(out)
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

/// In-memory fake for unit tests: a canned response queue and a record of
/// everything written.
#[cfg(test)]
pub struct FakeSerial {
    pub written: Vec<u8>,
    pub responses: std::collections::VecDeque<Vec<u8>>,
}

#[cfg(test)]
impl FakeSerial {
    pub fn new() -> FakeSerial {
        FakeSerial { written: Vec::new(), responses: std::collections::VecDeque::new() }
    }

    pub fn push_response(&mut self, bytes: Vec<u8>) {
        self.responses.push_back(bytes);
    }
}

#[cfg(test)]
impl SerialIo for FakeSerial {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.written.extend_from_slice(buf);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<()> {
        let resp = self.responses.pop_front().ok_or_else(|| RptError::Timeout("fake serial response"))?;
        if resp.len() < buf.len() {
            return Err(RptError::Timeout("fake serial short response"));
        }
        buf.copy_from_slice(&resp[..buf.len()]);
        Ok(())
    }

    fn read_until(&mut self, terminator: u8, _timeout: Duration) -> Result<Vec<u8>> {
        let resp = self.responses.pop_front().ok_or_else(|| RptError::Timeout("fake serial response"))?;
        Ok(resp.into_iter().take_while(|&b| b != terminator).collect())
    }

    fn sleep(&self, _dur: Duration) {}
}
