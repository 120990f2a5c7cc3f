#![forbid(unsafe_code)]

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use bcmnv::nv::{profile, Container, NvError, NvResult, ReadOptions, SchemaCatalog, TypeHint};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    /// Sniff the container type from the first 16 bytes.
    Auto,
    /// permnv (permanent nonvol) image.
    Perm,
    /// dynnv (dynamic nonvol) image.
    Dyn,
    /// gwsettings backup file.
    Gwsettings,
}

#[derive(Debug, Parser)]
#[command(name = "bcmnv", version, about = "Broadcom cable-modem nonvol settings codec")]
struct Cli {
    /// Container type of the input file.
    #[arg(value_enum)]
    kind: KindArg,

    /// Settings dump to read.
    file: PathBuf,

    /// Force a device profile instead of auto-detecting one.
    #[arg(short, long)]
    profile: Option<String>,

    /// AES-256 key as 64 hex digits.
    #[arg(short, long)]
    key: Option<String>,

    /// Derive the AES key from a password (requires --profile).
    #[arg(long)]
    password: Option<String>,

    /// Fail on the first bad group instead of truncating the stream.
    #[arg(long)]
    strict: bool,

    /// Log more to stderr (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the container header and all groups (default).
    Show,

    /// Pretty-print one value by dotted name (e.g. userif.http_user).
    Get { name: String },

    /// Set one value by dotted name and re-encode the container.
    Set {
        name: String,
        value: String,
        /// Output file; defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> NvResult<()> {
    let forced_profile = match &cli.profile {
        Some(name) => Some(
            profile::find(name)
                .ok_or_else(|| NvError::Invalid(format!("unknown profile '{name}'")))?,
        ),
        None => None,
    };

    let key = match (&cli.key, &cli.password) {
        (Some(hexkey), _) => Some(parse_key(hexkey)?),
        (None, Some(password)) => {
            let p = forced_profile
                .ok_or_else(|| NvError::Invalid("--password requires --profile".into()))?;
            Some(p.key_from_password(password).ok_or_else(|| {
                NvError::Invalid(format!(
                    "profile '{}' has no password key derivation",
                    p.name()
                ))
            })?)
        }
        (None, None) => None,
    };

    let hint = match cli.kind {
        KindArg::Auto => TypeHint::Auto,
        KindArg::Perm => TypeHint::Perm,
        KindArg::Dyn => TypeHint::Dyn,
        KindArg::Gwsettings => TypeHint::GwSettings,
    };

    let catalog = SchemaCatalog::builtin();
    let opts = ReadOptions {
        hint,
        profile: forced_profile,
        key,
        strict: cli.strict,
        catalog: &catalog,
    };

    let mut file = File::open(&cli.file)?;
    let mut container = Container::read(&mut file, &opts)?;
    drop(file);

    match cli.cmd.unwrap_or(Command::Show) {
        Command::Show => {
            print!("{}", container.header());
            for group in container.groups() {
                println!();
                println!("{} = {}", group.name, group.to_pretty());
            }
        }
        Command::Get { name } => {
            let val = container
                .get(&name)
                .ok_or_else(|| NvError::Parse(format!("no such value: '{name}'")))?;
            println!("{name} = {}", val.to_pretty());
        }
        Command::Set {
            name,
            value,
            output,
        } => {
            let val = container
                .get_mut(&name)
                .ok_or_else(|| NvError::Parse(format!("no such value: '{name}'")))?;
            val.parse(&value)?;
            println!("{name} = {}", val.to_pretty());

            let out_path = output.unwrap_or_else(|| cli.file.clone());
            let mut out = File::create(&out_path)?;
            container.write(&mut out)?;
        }
    }

    Ok(())
}

fn parse_key(text: &str) -> NvResult<[u8; 32]> {
    let bytes = hex::decode(text)
        .map_err(|_| NvError::Invalid(format!("key is not valid hex: '{text}'")))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| NvError::Invalid("key must be 64 hex digits".into()))?;
    Ok(key)
}
