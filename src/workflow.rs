//! Write with a read before and after.
//!
//! The three steps always run in order. A failing step is recorded and the
//! next one still runs, so the operator sees the value after a failed write
//! as well.

use crate::{Client, Coil, Result};

/// The recorded outcome of each step of a verified write.
#[derive(Debug)]
pub struct VerifiedWrite<T> {
    pub address: u16,
    pub value: T,
    pub before: Result<T>,
    pub write: Result<()>,
    pub after: Result<T>,
}

impl<T: PartialEq> VerifiedWrite<T> {
    /// The write succeeded and the slave now holds the written value.
    pub fn confirmed(&self) -> bool {
        self.write.is_ok() && matches!(self.after, Ok(ref v) if *v == self.value)
    }
}

/// Read, write and re-read the register at `address`.
pub fn write_register<C: Client>(client: &mut C, address: u16, value: u16) -> VerifiedWrite<u16> {
    verified(
        client,
        address,
        value,
        |c, a| c.read_holding_register(a),
        |c, a, v| c.write_single_register(a, v),
    )
}

/// Read, write and re-read the coil at `address`.
pub fn write_coil<C: Client>(client: &mut C, address: u16, value: Coil) -> VerifiedWrite<Coil> {
    verified(
        client,
        address,
        value,
        |c, a| c.read_coil(a),
        |c, a, v| c.write_single_coil(a, v),
    )
}

fn verified<C, T, R, W>(
    client: &mut C,
    address: u16,
    value: T,
    read: R,
    write: W,
) -> VerifiedWrite<T>
where
    C: Client,
    T: Copy,
    R: Fn(&mut C, u16) -> Result<T>,
    W: FnOnce(&mut C, u16, T) -> Result<()>,
{
    let before = read(&mut *client, address);
    let write = write(&mut *client, address, value);
    if let Err(ref e) = write {
        log::debug!("write to {} failed: {}", address, e);
    }
    let after = read(client, address);

    VerifiedWrite {
        address,
        value,
        before,
        write,
        after,
    }
}
