//! Serial framing parameters per device make.

use std::fmt;

use serialport::{DataBits, Parity, StopBits};

/// Device makes with a known serial configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Make {
    /// LICHUAN servo drives, 19200 8E1.
    Lichuan,
    /// SZGH controllers, 9600 8N1.
    Szgh,
    /// Generic VFDs, 9600 8N1.
    #[default]
    Vfd,
}

impl Make {
    /// Look a make up by name or by its letter (`a`, `b`, `c`).
    ///
    /// Selection is total: anything unrecognised is the default make.
    pub fn from_name(name: &str) -> Make {
        match name.trim().to_ascii_lowercase().as_str() {
            "lichuan" | "a" => Make::Lichuan,
            "szgh" | "b" => Make::Szgh,
            "vfd" | "c" => Make::Vfd,
            other => {
                let fallback = Make::default();
                log::warn!("unknown device make {:?}, using {}", other, fallback);
                fallback
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Make::Lichuan => "lichuan",
            Make::Szgh => "szgh",
            Make::Vfd => "vfd",
        }
    }

    pub fn profile(self) -> DeviceProfile {
        match self {
            Make::Lichuan => DeviceProfile {
                make: self,
                baud_rate: 19200,
                data_bits: DataBits::Eight,
                parity: Parity::Even,
                stop_bits: StopBits::One,
            },
            Make::Szgh | Make::Vfd => DeviceProfile {
                make: self,
                baud_rate: 9600,
                data_bits: DataBits::Eight,
                parity: Parity::None,
                stop_bits: StopBits::One,
            },
        }
    }
}

impl fmt::Display for Make {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serial parameters used to open the link to a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub make: Make,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for DeviceProfile {
    fn default() -> DeviceProfile {
        Make::default().profile()
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let data = match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        let (make, baud) = (self.make, self.baud_rate);
        write!(f, "{make} {baud} {data}{parity}{stop}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_table() {
        let a = Make::from_name("lichuan").profile();
        assert_eq!(a.baud_rate, 19200);
        assert_eq!(a.parity, Parity::Even);
        assert_eq!(a.data_bits, DataBits::Eight);
        assert_eq!(a.stop_bits, StopBits::One);

        for name in ["szgh", "B", "vfd", "c"] {
            let p = Make::from_name(name).profile();
            assert_eq!(p.baud_rate, 9600);
            assert_eq!(p.parity, Parity::None);
            assert_eq!(p.stop_bits, StopBits::One);
        }
    }

    #[test]
    fn unknown_make_falls_back_to_default() {
        assert_eq!(Make::from_name("mystery"), Make::Vfd);
        assert_eq!(Make::from_name(""), Make::Vfd);
        assert_eq!(DeviceProfile::default().make, Make::Vfd);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Make::Lichuan.profile().to_string(), "lichuan 19200 8E1");
        assert_eq!(Make::Vfd.profile().to_string(), "vfd 9600 8N1");
    }
}
