//! ovfgen CLI - Generate OVF envelopes for OLVM and VirtualBox.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ovfgen_core::disk::DEFAULT_QEMU_IMG;
use ovfgen_core::params::{DEFAULT_CPU, DEFAULT_MEMORY_MB};
use ovfgen_core::{
    generate_olvm, generate_vbox, DiskImage, Error, GeneratePhase, OlvmOptions, OlvmParams,
    ProgressCallback, RandomIds, VboxParams,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Generate OVF envelopes for importing Oracle Linux images.
#[derive(Parser)]
#[command(name = "ovfgen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Suppress progress output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an OLVM (oVirt) OVF envelope.
    Olvm(OlvmArgs),

    /// Generate a VirtualBox OVF envelope.
    #[command(alias = "vbox")]
    Virtualbox(VboxArgs),
}

#[derive(Args)]
struct OlvmArgs {
    /// Release.
    #[arg(short, long, default_value = "OL7")]
    release: String,

    /// Update, e.g. 7.
    #[arg(short, long)]
    update: String,

    /// Build version, e.g. 2.
    #[arg(short = 'v', long = "version", default_value = "0")]
    build_version: String,

    /// Number of VCPU.
    #[arg(short, long, default_value_t = DEFAULT_CPU, value_parser = clap::value_parser!(u32).range(1..))]
    cpu: u32,

    /// Memory size in MB.
    #[arg(short, long, default_value_t = DEFAULT_MEMORY_MB, value_parser = clap::value_parser!(u32).range(1..))]
    memory: u32,

    /// Image size in GB, e.g. 10.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    size: u64,

    /// Image file name.
    #[arg(short, long, default_value = "System.qcow")]
    image: PathBuf,

    /// Create a template.
    #[arg(short, long)]
    template: bool,

    /// Cloud-init custom script.
    #[arg(long)]
    script: Option<String>,

    /// qemu-img executable used to measure the image.
    #[arg(long, env = "OVFGEN_QEMU_IMG", default_value = DEFAULT_QEMU_IMG)]
    qemu_img: PathBuf,
}

#[derive(Args)]
struct VboxArgs {
    /// Image name.
    #[arg(short, long)]
    name: String,

    /// Number of VCPU.
    #[arg(short, long, default_value_t = DEFAULT_CPU, value_parser = clap::value_parser!(u32).range(1..))]
    cpu: u32,

    /// Memory size in MB.
    #[arg(short, long, default_value_t = DEFAULT_MEMORY_MB, value_parser = clap::value_parser!(u32).range(1..))]
    memory: u32,

    /// Image file name.
    #[arg(short, long)]
    image: PathBuf,

    /// Image size in GB, e.g. 10.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    size: u64,

    /// Optional extra image file name.
    #[arg(long)]
    extra_image: Option<PathBuf>,

    /// Optional extra image size in GB, e.g. 10.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    extra_size: Option<u64>,

    /// UEFI firmware.
    #[arg(long)]
    uefi: bool,

    /// aarch64 architecture (Apple Silicon).
    #[arg(long)]
    aarch64: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let xml = match cli.command {
        Commands::Olvm(args) => run_olvm(args, cli.quiet)?,
        Commands::Virtualbox(args) => run_vbox(args)?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(xml.as_bytes())?;
    stdout.flush()?;
    debug!(bytes = xml.len(), "Wrote envelope");

    Ok(())
}

/// Log to stderr, `warn` and above unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run_olvm(args: OlvmArgs, quiet: bool) -> Result<String> {
    let params = OlvmParams {
        release: args.release,
        update: args.update,
        build_version: args.build_version,
        cpu: args.cpu,
        memory_mb: args.memory,
        image: DiskImage::new(args.image, args.size),
        template: args.template,
        script: args.script,
    };
    params.validate().map_err(usage_error)?;

    let options = OlvmOptions::new(args.qemu_img);

    // Converting a large image takes a while; show a spinner meanwhile
    let spinner = if quiet { None } else { Some(new_spinner()?) };
    let callback: Option<ProgressCallback> = spinner.clone().map(|pb| {
        Box::new(move |phase: GeneratePhase| {
            let phase_msg = match phase {
                GeneratePhase::Validating => "Validating...",
                GeneratePhase::MeasuringDisk => "Measuring uncompressed disk size...",
                GeneratePhase::Assembling => "Assembling envelope...",
                GeneratePhase::Serializing => "Writing XML...",
                GeneratePhase::Complete => "Complete!",
            };
            pb.set_message(phase_msg);
        }) as ProgressCallback
    });

    let result = generate_olvm(&params, &options, &mut RandomIds, callback);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    Ok(result?.xml)
}

fn run_vbox(args: VboxArgs) -> Result<String> {
    let params = VboxParams::new(
        args.name,
        args.cpu,
        args.memory,
        DiskImage::new(args.image, args.size),
        args.extra_image,
        args.extra_size,
        args.uefi,
        args.aarch64,
    )
    .map_err(usage_error)?;

    Ok(generate_vbox(&params, &mut RandomIds, None)?)
}

fn new_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Report invalid parameters the way clap reports bad arguments: usage error
/// on stderr, exit code 2.
fn usage_error(err: Error) -> anyhow::Error {
    match err {
        Error::InvalidParameters { message } => Cli::command()
            .error(ErrorKind::ValueValidation, message)
            .exit(),
        other => other.into(),
    }
}
