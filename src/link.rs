//! Scoped ownership of the serial port.

use std::io;

use serialport::{FlowControl, SerialPort};

use crate::profile::DeviceProfile;
use crate::rtu::{Connection, Slave, RESPONSE_TIMEOUT};
use crate::{Error, Result, SLAVE_ID};

/// An open serial port configured for one device profile.
///
/// The port is released when the link is dropped, so every exit path of a
/// command closes it, including early returns through `?`.
pub struct SerialLink {
    name: String,
    profile: DeviceProfile,
    connection: Connection<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Configure `port` with the profile's framing and the fixed response
    /// timeout, then open it.
    pub fn open(port: &str, profile: DeviceProfile) -> Result<SerialLink> {
        let handle = serialport::new(port, profile.baud_rate)
            .data_bits(profile.data_bits)
            .parity(profile.parity)
            .stop_bits(profile.stop_bits)
            .flow_control(FlowControl::None)
            .timeout(RESPONSE_TIMEOUT)
            .open()
            .map_err(|source| Error::PortUnavailable {
                port: port.to_string(),
                source,
            })?;

        log::debug!("opened {} as {}", port, profile);
        Ok(SerialLink {
            name: port.to_string(),
            profile,
            connection: Connection::new(handle),
        })
    }

    /// Open a link, hand the slave to `f` and close the link again.
    pub fn scoped<R, F>(port: &str, profile: DeviceProfile, f: F) -> Result<R>
    where
        F: FnOnce(&mut Slave<'_, Box<dyn SerialPort>>) -> R,
    {
        let mut link = SerialLink::open(port, profile)?;
        let result = f(&mut link.slave());
        link.close();
        Ok(result)
    }

    /// The slave this link talks to.
    pub fn slave(&mut self) -> Slave<'_, Box<dyn SerialPort>> {
        self.connection.slave(SLAVE_ID)
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        log::debug!("closing {} ({})", self.name, self.profile);
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(io::Error::from)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Make;

    const MISSING: &str = "/dev/this-port-does-not-exist";

    #[cfg(unix)]
    #[test]
    fn missing_port_is_unavailable() {
        match SerialLink::open(MISSING, Make::Vfd.profile()) {
            Err(Error::PortUnavailable { port, .. }) => assert_eq!(port, MISSING),
            Err(other) => panic!("unexpected {:?}", other),
            Ok(_) => panic!("opened {}", MISSING),
        }
    }

    #[cfg(unix)]
    #[test]
    fn scoped_never_runs_without_a_port() {
        let mut ran = false;
        let result = SerialLink::scoped(MISSING, Make::Lichuan.profile(), |_| ran = true);
        assert!(result.is_err());
        assert!(!ran);
    }
}
