//! Register scan across the address space.
//!
//! [`Scan`] reads one holding register per address, in ascending order, and
//! yields each outcome as soon as it is known. A failed address is yielded as
//! a [`ScanFailure`] and the scan moves on; it is never aborted.

use std::io::{self, Write};
use std::ops::RangeInclusive;

use crate::{Client, Error};

/// Every holding register address.
pub const FULL_RANGE: RangeInclusive<u16> = 0..=u16::MAX;

/// A register that answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRecord {
    pub address: u16,
    pub value: u16,
}

/// A register that did not.
#[derive(Debug)]
pub struct ScanFailure {
    pub address: u16,
    pub error: Error,
}

pub type ScanResult = std::result::Result<ScanRecord, ScanFailure>;

pub struct Scan<C> {
    client: C,
    addresses: RangeInclusive<u16>,
}

impl<C: Client> Scan<C> {
    /// Scan all 65536 addresses.
    pub fn new(client: C) -> Scan<C> {
        Scan::range(client, FULL_RANGE)
    }

    pub fn range(client: C, addresses: RangeInclusive<u16>) -> Scan<C> {
        Scan { client, addresses }
    }

    /// Only the addresses that answered.
    pub fn records(self) -> impl Iterator<Item = ScanRecord> {
        self.filter_map(|r| r.ok())
    }
}

impl<C: Client> Iterator for Scan<C> {
    type Item = ScanResult;

    fn next(&mut self) -> Option<ScanResult> {
        let address = self.addresses.next()?;
        Some(match self.client.read_holding_register(address) {
            Ok(value) => Ok(ScanRecord { address, value }),
            Err(error) => {
                log::debug!("register {}: {}", address, error);
                Err(ScanFailure { address, error })
            }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.addresses.size_hint()
    }
}

/// Tab separated scan output, written line by line.
pub struct TsvSink<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> TsvSink<W> {
    pub const HEADER: &'static str = "Register\tValue";

    pub fn new(mut out: W) -> io::Result<TsvSink<W>> {
        writeln!(out, "{}", Self::HEADER)?;
        Ok(TsvSink { out, lines: 0 })
    }

    pub fn record(&mut self, record: &ScanRecord) -> io::Result<()> {
        writeln!(self.out, "{}\t{}", record.address, record.value)?;
        self.lines += 1;
        Ok(())
    }

    /// Data lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockSlave;
    use crate::Function;

    #[test]
    fn visits_every_address_once_in_order() {
        let mut slave = MockSlave::default();
        slave.silent.extend([0u16, 7, 65535]);
        let results: Vec<ScanResult> = Scan::new(&mut slave).collect();

        assert_eq!(results.len(), 65536);
        for (i, r) in results.iter().enumerate() {
            let address = match r {
                Ok(rec) => rec.address,
                Err(f) => f.address,
            };
            assert_eq!(address as usize, i);
        }
        assert!(results[0].is_err());
        assert!(results[7].is_err());
        assert!(results[65535].is_err());
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 65533);

        assert_eq!(slave.log.len(), 65536);
        assert_eq!(slave.log[0], Function::ReadHoldingRegisters(0, 1));
        assert_eq!(slave.log[65535], Function::ReadHoldingRegisters(65535, 1));
    }

    #[test]
    fn records_only_successes() {
        let mut slave = MockSlave::with_registers(&[(1, 11), (2, 22), (3, 33)]);
        slave.silent.insert(2);
        let records: Vec<(u16, u16)> = Scan::range(&mut slave, 1..=3)
            .records()
            .map(|r| (r.address, r.value))
            .collect();
        assert_eq!(records, vec![(1, 11), (3, 33)]);
    }

    #[test]
    fn everything_failing_still_terminates() {
        let mut slave = MockSlave::default();
        slave.silent.extend(100..=200u16);
        let scan = Scan::range(&mut slave, 100..=200);
        assert_eq!(scan.size_hint(), (101, Some(101)));
        assert_eq!(scan.records().count(), 0);
        assert_eq!(slave.log.len(), 101);
    }

    #[test]
    fn tsv_layout() {
        let mut sink = TsvSink::new(Vec::new()).unwrap();
        for (address, value) in [(0, 5), (9, 65535)] {
            sink.record(&ScanRecord { address, value }).unwrap();
        }
        assert_eq!(sink.lines(), 2);
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "Register\tValue\n0\t5\n9\t65535\n");
    }
}
