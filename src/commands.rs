//! Bodies of the command-line commands.
//!
//! Each command takes the client it talks through and the writer its
//! operator output goes to. Transaction failures are reported in that output
//! and do not fail the command; only output errors are returned.

use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::slice;

use crate::scan::{Scan, ScanFailure, TsvSink};
use crate::workflow::{self, VerifiedWrite};
use crate::{Client, Coil, Error};

/// What a register scan produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub visited: usize,
    pub recorded: usize,
}

/// Addresses `start`, `start + 1`, ... for `count` items, stopping at the
/// last valid address.
fn addresses(start: u16, count: u16) -> impl Iterator<Item = u16> {
    (start as u32..start as u32 + count as u32)
        .take_while(|&a| a <= u16::MAX as u32)
        .map(|a| a as u16)
}

pub fn list<W: Write>(out: &mut W, ports: &[String]) -> io::Result<()> {
    writeln!(out, "The following serial ports were found:")?;
    for port in ports {
        writeln!(out, "{}", port)?;
    }
    Ok(())
}

fn print_registers<W: Write>(
    out: &mut W,
    start: u16,
    result: Result<&[u16], &Error>,
) -> io::Result<()> {
    match result {
        Ok(values) => {
            for (i, value) in values.iter().enumerate() {
                let address = start as usize + i;
                writeln!(out, "Register {address}={value} - {value:02X}")?;
            }
            Ok(())
        }
        Err(e) => writeln!(out, "Exception reading registers: {}", e),
    }
}

fn print_coil<W: Write>(
    out: &mut W,
    address: u16,
    result: Result<&Coil, &Error>,
) -> io::Result<()> {
    match result {
        Ok(coil) => writeln!(out, "Coil {} = {}", address, coil),
        Err(e) => writeln!(out, "Exception reading coil {}: {}", address, e),
    }
}

/// Read `count` holding registers from `start` in one transaction.
pub fn read_registers<C, W>(client: &mut C, out: &mut W, start: u16, count: u16) -> io::Result<()>
where
    C: Client,
    W: Write,
{
    let result = client.read_holding_registers(start, count);
    print_registers(out, start, result.as_deref())
}

/// Read `count` coils from `start`, one transaction per coil.
///
/// A coil that fails is reported and the next one is still read.
pub fn read_coils<C, W>(client: &mut C, out: &mut W, start: u16, count: u16) -> io::Result<()>
where
    C: Client,
    W: Write,
{
    for address in addresses(start, count) {
        let result = client.read_coil(address);
        print_coil(out, address, result.as_ref())?;
    }
    Ok(())
}

pub fn write_register<C, W>(
    client: &mut C,
    out: &mut W,
    address: u16,
    value: u16,
) -> io::Result<VerifiedWrite<u16>>
where
    C: Client,
    W: Write,
{
    let outcome = workflow::write_register(client, address, value);

    print_registers(out, address, outcome.before.as_ref().map(slice::from_ref))?;
    writeln!(out, "Writing new value: {}", value)?;
    if let Err(ref e) = outcome.write {
        writeln!(out, "{}: {}", address, e)?;
    }
    print_registers(out, address, outcome.after.as_ref().map(slice::from_ref))?;
    Ok(outcome)
}

pub fn write_coil<C, W>(
    client: &mut C,
    out: &mut W,
    address: u16,
    value: Coil,
) -> io::Result<VerifiedWrite<Coil>>
where
    C: Client,
    W: Write,
{
    let outcome = workflow::write_coil(client, address, value);

    print_coil(out, address, outcome.before.as_ref())?;
    writeln!(out, "Writing new value: {}", value)?;
    if let Err(ref e) = outcome.write {
        writeln!(out, "Exception writing coil: {}", e)?;
    }
    print_coil(out, address, outcome.after.as_ref())?;
    Ok(outcome)
}

/// Scan `range`, writing every register that answered to `file` as it
/// arrives and echoing progress to `out`.
pub fn read_all_registers<C, F, W>(
    client: &mut C,
    file: F,
    out: &mut W,
    range: RangeInclusive<u16>,
) -> io::Result<ScanSummary>
where
    C: Client,
    F: Write,
    W: Write,
{
    let mut sink = TsvSink::new(file)?;
    let mut visited = 0;

    for result in Scan::range(client, range) {
        visited += 1;
        match result {
            Ok(record) => {
                writeln!(out, "Register {} : {}", record.address, record.value)?;
                sink.record(&record)?;
            }
            Err(ScanFailure { address, error }) => {
                writeln!(out, "{address}: Exception reading registers: {error}")?;
            }
        }
    }

    let recorded = sink.lines();
    sink.finish()?;
    Ok(ScanSummary { visited, recorded })
}
