use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use modbus_rtu_master::{commands, link, Coil, Make, SerialLink};

/// Modbus RTU master for a single slave (id 1) on a serial port
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device make selecting the serial framing: lichuan (19200 8E1),
    /// szgh or vfd (9600 8N1)
    #[arg(long, env = "MODBUS_MAKE", default_value = "vfd", global = true)]
    make: String,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists the available serial ports
    List,
    /// Reads a number of registers
    Read {
        /// The serial port to use
        portname: String,
        /// Starting address of registers to read
        startaddress: u16,
        /// Number of registers to read
        numregisters: u16,
    },
    /// Writes a value to a register
    Write {
        /// The serial port to use
        portname: String,
        /// Register address
        startaddress: u16,
        /// Value to write
        regval: u16,
    },
    /// Reads a range of coils
    #[command(name = "readcoils")]
    ReadCoils {
        /// The serial port to use
        portname: String,
        /// Starting address of coils to read
        startaddress: u16,
        /// Number of coils to read
        numcoils: u16,
    },
    /// Writes a single coil
    #[command(name = "writecoil")]
    WriteCoil {
        /// The serial port to use
        portname: String,
        /// Coil address
        startaddress: u16,
        /// Value to write (true or false)
        #[arg(action = ArgAction::Set)]
        coilval: bool,
    },
    /// Reads all registers and writes them to a file
    #[command(name = "readallregisters")]
    ReadAllRegisters {
        /// The serial port to use
        portname: String,
        /// Name of the file to output results to
        filename: PathBuf,
        /// First address to scan
        #[arg(long, default_value_t = 0)]
        from: u16,
        /// Last address to scan
        #[arg(long, default_value_t = u16::MAX)]
        to: u16,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).init();
}

fn run(args: Args) -> Result<()> {
    let profile = Make::from_name(&args.make).profile();
    log::debug!("device profile {}", profile);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::List => {
            let ports = link::list_ports().context("cannot enumerate serial ports")?;
            commands::list(&mut out, &ports)?;
        }
        Command::Read {
            portname,
            startaddress,
            numregisters,
        } => {
            SerialLink::scoped(&portname, profile, |slave| {
                commands::read_registers(slave, &mut out, startaddress, numregisters)
            })??;
        }
        Command::Write {
            portname,
            startaddress,
            regval,
        } => {
            SerialLink::scoped(&portname, profile, |slave| {
                commands::write_register(slave, &mut out, startaddress, regval)
            })??;
        }
        Command::ReadCoils {
            portname,
            startaddress,
            numcoils,
        } => {
            SerialLink::scoped(&portname, profile, |slave| {
                commands::read_coils(slave, &mut out, startaddress, numcoils)
            })??;
        }
        Command::WriteCoil {
            portname,
            startaddress,
            coilval,
        } => {
            SerialLink::scoped(&portname, profile, |slave| {
                commands::write_coil(slave, &mut out, startaddress, Coil::from(coilval))
            })??;
        }
        Command::ReadAllRegisters {
            portname,
            filename,
            from,
            to,
        } => {
            if from > to {
                bail!("scan range is empty: --from {from} is after --to {to}");
            }
            // the file is only created once the port is open
            let summary = SerialLink::scoped(&portname, profile, |slave| -> Result<_> {
                let file = File::create(&filename)
                    .with_context(|| format!("cannot create {}", filename.display()))?;
                commands::read_all_registers(slave, BufWriter::new(file), &mut out, from..=to)
                    .with_context(|| format!("cannot write {}", filename.display()))
            })??;
            let (visited, recorded) = (summary.visited, summary.recorded);
            let file = filename.display();
            log::info!("scanned {visited} registers, wrote {recorded} to {file}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}
