//! Modbus RTU master for a single slave on a serial line.
//!
//! The crate is built from small pieces: a [`DeviceProfile`] describing the
//! serial framing of a device make, a [`SerialLink`] owning the open port,
//! the RTU [`Connection`](rtu::Connection) that frames requests and waits for
//! responses, and the [`Client`] trait with the four supported transactions.
//! [`workflow`] and [`scan`] compose those transactions into the verifying
//! write and the full address space scan.

#[macro_use]
extern crate enum_primitive;

use std::fmt;
use std::io;

pub mod binary;
pub mod client;
pub mod commands;
pub mod link;
pub mod profile;
pub mod rtu;
pub mod scan;
pub mod workflow;

pub use client::Client;
pub use link::SerialLink;
pub use profile::{DeviceProfile, Make};

/// The only slave this master ever talks to.
pub const SLAVE_ID: u8 = 1;

/// Request/response functions supported by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    ReadCoils(u16, u16),
    ReadHoldingRegisters(u16, u16),
    WriteSingleCoil(u16, u16),
    WriteSingleRegister(u16, u16),
}

impl Function {
    pub fn code(&self) -> u8 {
        match *self {
            Function::ReadCoils(_, _) => 0x01,
            Function::ReadHoldingRegisters(_, _) => 0x03,
            Function::WriteSingleCoil(_, _) => 0x05,
            Function::WriteSingleRegister(_, _) => 0x06,
        }
    }

    /// Address field and the count (reads) or value (writes) field.
    pub fn fields(&self) -> (u16, u16) {
        match *self {
            Function::ReadCoils(a, n)
            | Function::ReadHoldingRegisters(a, n)
            | Function::WriteSingleCoil(a, n)
            | Function::WriteSingleRegister(a, n) => (a, n),
        }
    }
}

/// Single bit status value, used for coils.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coil {
    On,
    Off,
}

impl Coil {
    /// Value put on the wire by a write single coil request.
    pub fn code(self) -> u16 {
        match self {
            Coil::On => 0xff00,
            Coil::Off => 0x0000,
        }
    }

    pub fn is_on(self) -> bool {
        self == Coil::On
    }
}

impl From<bool> for Coil {
    fn from(b: bool) -> Coil {
        if b {
            Coil::On
        } else {
            Coil::Off
        }
    }
}

impl From<Coil> for bool {
    fn from(c: Coil) -> bool {
        c.is_on()
    }
}

impl fmt::Display for Coil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.is_on())
    }
}

enum_from_primitive! {
/// Exception codes a slave returns in place of a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
    Acknowledge = 0x05,
    SlaveDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0a,
    GatewayTargetFailedToRespond = 0x0b
}
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match *self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::SlaveDeviceFailure => "slave device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::SlaveDeviceBusy => "slave device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "gateway target failed to respond",
        };
        write!(f, "{} ({:#04x})", desc, *self as u8)
    }
}

/// Why a request was refused before it reached the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// A read asked for zero items.
    EmptyRequest,
    /// A read asked for more items than fit in one RTU frame.
    TooManyItems { requested: u16, max: u16 },
    /// The function code cannot be sent through this call.
    UnsupportedFunction(u8),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reason::EmptyRequest => write!(f, "count must be at least 1"),
            Reason::TooManyItems { requested, max } => {
                write!(f, "{requested} items requested, at most {max} allowed")
            }
            Reason::UnsupportedFunction(code) => {
                write!(f, "function {:#04x} not allowed here", code)
            }
        }
    }
}

/// A response that arrived but could not be accepted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("slave returned exception: {0}")]
    Exception(ExceptionCode),
    #[error("slave returned unknown exception code {0:#04x}")]
    UnknownException(u8),
    #[error("incorrect CRC: received {received:#06x}, calculated {calculated:#06x}")]
    IncorrectCrc { received: u16, calculated: u16 },
    #[error("response from slave {0}")]
    UnexpectedSlave(u8),
    #[error("response function code {received:#04x}, expected {expected:#04x}")]
    UnexpectedFunction { received: u8, expected: u8 },
    #[error("response byte count {received}, expected {expected}")]
    ByteCountMismatch { received: u8, expected: u8 },
    #[error("{0} data bytes do not make whole registers")]
    OddByteCount(usize),
    #[error("write echo mismatch: address {address}, value {value:#06x}")]
    EchoMismatch { address: u16, value: u16 },
}

/// Errors of the master.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open serial port {port}: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("timed out waiting for response")]
    Timeout,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid request: {0}")]
    InvalidData(Reason),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(*self, Error::Timeout)
    }
}

impl From<ExceptionCode> for Error {
    fn from(code: ExceptionCode) -> Error {
        Error::Protocol(ProtocolError::Exception(code))
    }
}

/// Result type used by the master.
pub type Result<T> = std::result::Result<T, Error>;
