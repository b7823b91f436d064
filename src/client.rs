use crate::{binary, Coil, Error, Function, ProtocolError, Result};

/// The transactions a master can run against one slave.
///
/// Every call is a single request/response round trip. Nothing is retried:
/// a timeout or a rejected response is returned to the caller as is.
pub trait Client {
    /// Send a read request and return the data bytes of the response.
    fn read_function_result(&mut self, fun: &Function) -> Result<Vec<u8>>;

    /// Send a write request, succeeding once the slave echoed it back.
    fn write_function(&mut self, fun: &Function) -> Result<()>;

    /// Read `count` bits starting at address `addr`.
    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<Coil>> {
        let bytes = self.read_function_result(&Function::ReadCoils(addr, count))?;
        Ok(binary::unpack_bits(&bytes, count))
    }

    /// Read `count` 16bit registers starting at address `addr`.
    fn read_holding_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>> {
        let bytes = self.read_function_result(&Function::ReadHoldingRegisters(addr, count))?;
        binary::pack_bytes(&bytes[..])
    }

    /// Read the single register at `addr`.
    fn read_holding_register(&mut self, addr: u16) -> Result<u16> {
        self.read_holding_registers(addr, 1)?
            .first()
            .cloned()
            .ok_or(Error::Protocol(ProtocolError::ByteCountMismatch {
                received: 0,
                expected: 2,
            }))
    }

    /// Read the single coil at `addr`.
    fn read_coil(&mut self, addr: u16) -> Result<Coil> {
        self.read_coils(addr, 1)?
            .first()
            .cloned()
            .ok_or(Error::Protocol(ProtocolError::ByteCountMismatch {
                received: 0,
                expected: 1,
            }))
    }

    /// Write a single coil (bit) to address `addr`.
    fn write_single_coil(&mut self, addr: u16, value: Coil) -> Result<()> {
        self.write_function(&Function::WriteSingleCoil(addr, value.code()))
    }

    /// Write a single 16bit register to address `addr`.
    fn write_single_register(&mut self, addr: u16, value: u16) -> Result<()> {
        self.write_function(&Function::WriteSingleRegister(addr, value))
    }
}

impl<C: Client + ?Sized> Client for &mut C {
    fn read_function_result(&mut self, fun: &Function) -> Result<Vec<u8>> {
        (**self).read_function_result(fun)
    }

    fn write_function(&mut self, fun: &Function) -> Result<()> {
        (**self).write_function(fun)
    }
}
