use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scratch-extgen",
    about = "Generate an unsandboxed compiler-patching Scratch extension from a JSON block config."
)]
pub struct Args {
    #[arg(value_name = "CONFIG", help = "Path to the JSON configuration file.")]
    pub config: Option<PathBuf>,

    #[arg(
        value_name = "OUTPUT",
        help = "Output path. Defaults to '<extension id>.js' in the current directory."
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Use random argument identifiers instead of '<opcode>_arg<n>' (output differs between runs)."
    )]
    pub random_ids: bool,

    #[arg(long, help = "Skip pretty-printing the generated module.")]
    pub no_format: bool,

    #[arg(
        long,
        value_name = "PROGRAM",
        default_value = "prettier",
        help = "Formatter executable invoked with prettier-compatible flags."
    )]
    pub prettier: String,

    #[arg(
        long,
        value_name = "PATH",
        help = "Also write the extension descriptor (getInfo result) as JSON to this path."
    )]
    pub emit_descriptor: Option<PathBuf>,
}
