use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use sisfsb::x86::RawPorts;
use sisfsb::{
    chips::Chips,
    delay::SpinDelay,
    pci::PciConfig,
    pll::{FreqEntry, FreqRequest, Pll},
    x86::{NullPorts, PortIo},
};

#[derive(Parser, Debug)]
#[command(
    name = "sisfsb",
    version,
    about = "Read or change the FSB/SDRAM/PCI clocks of SiS 540 boards through the PLL on the SMBus."
)]
struct Args {
    /// Clock generator on the board (see --list-plls)
    #[arg(long, value_name = "PLL")]
    pll: Option<String>,

    /// New clocks in MHz as FSB/SDRAM/PCI, or `list` to print the PLL's frequency table
    #[arg(long, value_name = "FSB/SDRAM/PCI|list")]
    fsb: Option<FreqRequest>,

    /// Log every register access
    #[arg(long, action = clap::ArgAction::SetTrue)]
    debug: bool,

    /// List every function present on the PCI bus and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    list_pci: bool,

    /// List the supported PLLs and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    list_plls: bool,

    /// Port I/O backend; `null` touches no hardware
    #[arg(long, value_enum, default_value_t = IoBackend::Raw)]
    io: IoBackend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum IoBackend {
    Raw,
    Null,
}

/// The backend picked on the command line.
#[derive(Clone, Copy, Debug)]
enum Ports {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Raw(RawPorts),
    Null(NullPorts),
}

impl Ports {
    fn open(backend: IoBackend) -> anyhow::Result<Self> {
        match backend {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            IoBackend::Raw => Ok(Ports::Raw(
                RawPorts::acquire().context("cannot access I/O ports (are you root?)")?,
            )),
            #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
            IoBackend::Raw => {
                tracing::warn!("no port I/O on this architecture, falling back to the null backend");
                Ok(Ports::Null(NullPorts))
            }
            IoBackend::Null => Ok(Ports::Null(NullPorts)),
        }
    }
}

impl PortIo for Ports {
    fn read_u8(&self, port: u16) -> u8 {
        match self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Ports::Raw(ports) => ports.read_u8(port),
            Ports::Null(ports) => ports.read_u8(port),
        }
    }

    fn read_u32(&self, port: u16) -> u32 {
        match self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Ports::Raw(ports) => ports.read_u32(port),
            Ports::Null(ports) => ports.read_u32(port),
        }
    }

    fn write_u8(&self, port: u16, value: u8) {
        match self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Ports::Raw(ports) => ports.write_u8(port, value),
            Ports::Null(ports) => ports.write_u8(port, value),
        }
    }

    fn write_u32(&self, port: u16, value: u32) {
        match self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Ports::Raw(ports) => ports.write_u32(port, value),
            Ports::Null(ports) => ports.write_u32(port, value),
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn list_plls(chips: &Chips) {
    println!("Supported PLLs:");
    for pll in chips.plls() {
        println!("  {pll}");
    }
}

fn select_pll(chips: &Chips, name: Option<&str>) -> anyhow::Result<&'static Pll> {
    let Some(name) = name else {
        eprintln!("Please specify a supported PLL: --pll <PLL>");
        list_plls(chips);
        bail!("no PLL selected");
    };
    match chips.find_pll(name) {
        Ok(pll) => Ok(pll),
        Err(err) => {
            list_plls(chips);
            Err(err.into())
        }
    }
}

/// Find the bridge, bring up the SMBus, probe the PLL, read the clocks and optionally change them.
fn program(
    pci: &PciConfig<Ports>,
    chips: &Chips,
    pll: &Pll,
    target: Option<FreqEntry>,
) -> anyhow::Result<()> {
    let bridge = chips.find_host_bridge(pci)?;
    let mut smbus = bridge
        .init_smbus(pci, SpinDelay)
        .context("failed to initialize SMBus")?;
    println!("{smbus}");

    pll.check(&mut smbus)?;
    println!("PLL chip passed quick write check: {pll}");

    let current = pll.get_fsb(&mut smbus)?;
    println!("Current FSB: {current}");

    let Some(target) = target else {
        return Ok(());
    };

    println!("Setting new FSB: {target}");
    pll.set_fsb(&target, &mut smbus)
        .with_context(|| format!("error setting FSB, still at {current}"))?;

    let current = pll.get_fsb(&mut smbus)?;
    println!("Current FSB: {current}");
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<()> {
    let chips = Chips::new();

    if args.list_plls {
        list_plls(&chips);
        return Ok(());
    }

    if args.list_pci {
        let pci = PciConfig::new(Ports::open(args.io)?);
        for (bdf, id) in pci.list_devices() {
            println!("{bdf} {id}");
        }
        return Ok(());
    }

    let pll = select_pll(&chips, args.pll.as_deref())?;
    let target = match args.fsb {
        Some(FreqRequest::List) => {
            println!("{}", pll.freq_table());
            return Ok(());
        }
        Some(FreqRequest::Set(entry)) => Some(entry),
        None => None,
    };

    let pci = PciConfig::new(Ports::open(args.io)?);
    program(&pci, &chips, pll, target)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
