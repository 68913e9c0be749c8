use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "robotblocks-rs",
    about = "Compiles visual block programs into guard-instrumented robot command scripts."
)]
pub struct Args {
    #[arg(value_name = "INPUT", help = "Block program JSON file.")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT", help = "Instrumented script output path (stdout if omitted).")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Robot model identifier used to namespace block kinds.")]
    pub model: String,

    #[arg(long, help = "Robot serial addressed by the generated command requests.")]
    pub serial: String,

    #[arg(long, help = "Write the raw (pre-instrumentation) script to this path.")]
    pub emit_raw: Option<PathBuf>,

    #[arg(
        long,
        help = "Emit the script even when instrumentation fell back and no loop protection is active."
    )]
    pub allow_unprotected: bool,
}
