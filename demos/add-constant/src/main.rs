//! Add a constant to every element of a GPU buffer and check the result.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use metal_compute::{CompileOptions, ComputeJob, DispatchForm, KernelSource};
use tracing_subscriber::EnvFilter;

const BUILTIN_KERNEL: &str = include_str!("../kernels/add_constant.metal");

#[derive(Parser)]
#[command(name = "add-constant")]
#[command(version, about = "Run an add-constant compute kernel on the default Metal device")]
struct Cli {
    /// Number of i32 elements in the buffer
    #[arg(long, default_value_t = 128)]
    length: usize,

    /// Value added to every element
    #[arg(long, default_value_t = 42)]
    constant: i32,

    /// Initial value of every element
    #[arg(long, default_value_t = 0)]
    initial: i32,

    /// Threads per threadgroup; must divide --length
    #[arg(long, default_value_t = 1)]
    threads_per_group: usize,

    /// Compile with strict floating-point semantics
    #[arg(long)]
    no_fast_math: bool,

    /// Kernel file (.metal, .wgsl or .metallib) instead of the built-in kernel
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Kernel entry point
    #[arg(long, default_value = "add_constant")]
    entry_point: String,

    /// Use the three-axis dispatch form
    #[arg(long)]
    grid_3d: bool,
}

impl Cli {
    fn job(&self) -> Result<ComputeJob<i32>> {
        let kernel = match &self.kernel {
            Some(path) => KernelSource::from_path(path)?,
            None => KernelSource::Msl(BUILTIN_KERNEL.to_string()),
        };
        let dispatch = if self.grid_3d {
            DispatchForm::Grid
        } else {
            DispatchForm::Linear
        };
        Ok(
            ComputeJob::new(kernel, self.entry_point.as_str(), vec![self.initial; self.length])
                .with_params(&self.constant)
                .with_options(CompileOptions::default().with_fast_math(!self.no_fast_math))
                .with_threads_per_threadgroup(self.threads_per_group)
                .with_dispatch(dispatch),
        )
    }
}

#[cfg(target_os = "macos")]
fn run(cli: &Cli) -> Result<()> {
    let job = cli.job()?;
    let result = objc2::rc::autoreleasepool(|_| job.run())?;

    for report in &result.stages {
        println!("{report}");
    }
    println!("device: {}", result.device_name);
    println!("output: {:?}", result.output);

    for (i, (input, output)) in job.input.iter().zip(&result.output).enumerate() {
        let expected = input.wrapping_add(cli.constant);
        if *output != expected {
            bail!("element {i} is {output}, expected {expected}");
        }
    }
    println!("all {} elements verified", result.output.len());
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(cli: &Cli) -> Result<()> {
    // Still validate the arguments and kernel so mistakes surface everywhere.
    cli.job()?;
    bail!("add-constant needs the Metal runtime, only available on macOS")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
