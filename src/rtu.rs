//! Modbus RTU framing over a byte stream.
//!
//! A [`Connection`] owns the port and runs one request/response exchange at
//! a time; [`Slave`] binds it to a slave id and implements [`Client`].

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use crc16::{State, MODBUS};
use enum_primitive::FromPrimitive;

use crate::binary;
use crate::{Client, Error, ExceptionCode, Function, ProtocolError, Reason, Result};

/// How long a slave gets to deliver a complete response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Registers that fit in one read response.
pub const MAX_REGISTERS: u16 = 125;
/// Coils that fit in one read response.
pub const MAX_COILS: u16 = 2000;

// id, function, byte count, up to 255 data bytes, crc
const MAX_FRAME: usize = 3 + 255 + 2;
const EXCEPTION_FLAG: u8 = 0x80;

/// Byte stream a [`Connection`] runs over.
pub trait Port: Read + Write {
    /// Drop input nobody asked for, such as a reply that arrived after its
    /// transaction timed out.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Bound the next blocking read.
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl Port for Box<dyn serialport::SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// CRC-16/MODBUS of `msg`.
pub fn crc(msg: &[u8]) -> u16 {
    State::<MODBUS>::calculate(msg)
}

pub struct Connection<T: Port> {
    port: T,
    timeout: Duration,
}

impl<T: Port> Connection<T> {
    pub fn new(port: T) -> Connection<T> {
        Connection::with_timeout(port, RESPONSE_TIMEOUT)
    }

    pub fn with_timeout(port: T, timeout: Duration) -> Connection<T> {
        Connection { port, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_ref(&self) -> &T {
        &self.port
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    /// Address slave `id` over this connection.
    pub fn slave(&mut self, id: u8) -> Slave<'_, T> {
        Slave {
            id,
            connection: self,
        }
    }

    fn write_with_crc(&mut self, msg: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(msg.len() + 2);
        frame.extend_from_slice(msg);

        let mut crc_bytes = [0, 0];
        LittleEndian::write_u16(&mut crc_bytes, crc(msg));
        frame.extend_from_slice(&crc_bytes);

        log::trace!("-> {:02X?}", frame);
        self.port.discard_input()?;
        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one response frame, check its CRC and turn exception responses
    /// into errors. The returned frame has the CRC removed.
    fn read(&mut self, expected_id: u8, expected_function: u8) -> Result<Vec<u8>> {
        let mut frame = self.read_dont_check_crc(expected_id, expected_function)?;
        log::trace!("<- {:02X?}", frame);

        let split = frame.len() - 2;
        let received = LittleEndian::read_u16(&frame[split..]);
        frame.truncate(split);
        let calculated = crc(&frame);
        if received != calculated {
            return Err(ProtocolError::IncorrectCrc {
                received,
                calculated,
            }
            .into());
        }

        if frame[1] == expected_function | EXCEPTION_FLAG {
            let code = frame[2];
            return Err(match ExceptionCode::from_u8(code) {
                Some(exception) => exception.into(),
                None => ProtocolError::UnknownException(code).into(),
            });
        }
        Ok(frame)
    }

    // Collect bytes until the frame is complete or the deadline passes.
    // Id and function code are checked as soon as they arrive.
    fn read_dont_check_crc(&mut self, expected_id: u8, expected_function: u8) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut frame = Vec::with_capacity(MAX_FRAME);
        let mut buf = [0u8; MAX_FRAME];

        loop {
            let want = match frame_length(&frame, expected_function) {
                Some(len) if frame.len() >= len => {
                    frame.truncate(len);
                    return Ok(frame);
                }
                Some(len) => len - frame.len(),
                None => 3 - frame.len(),
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            self.port.set_read_timeout(deadline - now)?;

            match self.port.read(&mut buf[..want]) {
                // The stream is closed, nothing more will arrive.
                Ok(0) => return Err(Error::Timeout),
                Ok(n) => {
                    frame.extend_from_slice(&buf[..n]);
                    check_header(&frame, expected_id, expected_function)?;
                }
                Err(ref e) if is_transient(e.kind()) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// The port gave up on this read, the deadline decides whether to retry.
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Total frame length including CRC, once enough of the frame is known.
fn frame_length(frame: &[u8], function: u8) -> Option<usize> {
    let code = *frame.get(1)?;
    if code == function | EXCEPTION_FLAG {
        return Some(5);
    }
    match function {
        // id, function, byte count, data, crc
        0x01 | 0x03 => frame.get(2).map(|&count| 3 + count as usize + 2),
        // id, function, address, value, crc
        _ => Some(8),
    }
}

fn check_header(frame: &[u8], expected_id: u8, expected_function: u8) -> Result<()> {
    if let Some(&id) = frame.first() {
        if id != expected_id {
            return Err(ProtocolError::UnexpectedSlave(id).into());
        }
    }
    if let Some(&code) = frame.get(1) {
        if code != expected_function && code != expected_function | EXCEPTION_FLAG {
            return Err(ProtocolError::UnexpectedFunction {
                received: code,
                expected: expected_function,
            }
            .into());
        }
    }
    Ok(())
}

/// A slave reached through a [`Connection`].
pub struct Slave<'a, T: Port> {
    id: u8,
    connection: &'a mut Connection<T>,
}

impl<T: Port> Slave<'_, T> {
    fn request(&self, fun: &Function) -> Result<Vec<u8>> {
        let (addr, field) = fun.fields();
        let mut msg = Vec::with_capacity(6);
        msg.write_u8(self.id)?;
        msg.write_u8(fun.code())?;
        msg.write_u16::<BigEndian>(addr)?;
        msg.write_u16::<BigEndian>(field)?;
        Ok(msg)
    }
}

impl<T: Port> Client for Slave<'_, T> {
    fn read_function_result(&mut self, fun: &Function) -> Result<Vec<u8>> {
        let (count, max, expected_bytes) = match *fun {
            Function::ReadCoils(_, c) => (c, MAX_COILS, binary::packed_size(c)),
            Function::ReadHoldingRegisters(_, c) => (c, MAX_REGISTERS, 2 * c as usize),
            _ => return Err(Error::InvalidData(Reason::UnsupportedFunction(fun.code()))),
        };

        if count < 1 {
            return Err(Error::InvalidData(Reason::EmptyRequest));
        }
        if count > max {
            return Err(Error::InvalidData(Reason::TooManyItems {
                requested: count,
                max,
            }));
        }

        log::debug!("slave {}: {:?}", self.id, fun);
        let msg = self.request(fun)?;
        self.connection.write_with_crc(&msg)?;
        let response = self.connection.read(self.id, fun.code())?;

        // id, function code, byte count, then the data
        let byte_count = response[2];
        if byte_count as usize != expected_bytes {
            return Err(ProtocolError::ByteCountMismatch {
                received: byte_count,
                expected: expected_bytes as u8,
            }
            .into());
        }
        Ok(response[3..].to_vec())
    }

    fn write_function(&mut self, fun: &Function) -> Result<()> {
        let (addr, value) = match *fun {
            Function::WriteSingleCoil(a, v) | Function::WriteSingleRegister(a, v) => (a, v),
            _ => return Err(Error::InvalidData(Reason::UnsupportedFunction(fun.code()))),
        };

        log::debug!("slave {}: {:?}", self.id, fun);
        let msg = self.request(fun)?;
        self.connection.write_with_crc(&msg)?;
        let response = self.connection.read(self.id, fun.code())?;

        // The slave echoes address and value back
        let echo_addr = BigEndian::read_u16(&response[2..4]);
        let echo_value = BigEndian::read_u16(&response[4..6]);
        if echo_addr != addr || echo_value != value {
            return Err(ProtocolError::EchoMismatch {
                address: echo_addr,
                value: echo_value,
            }
            .into());
        }
        Ok(())
    }
}
