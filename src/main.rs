use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fincantatem::{
    cli, logging, parse_panic_report, FincantatemError, PlainTextInterface, RenderMode,
    ReportOptions, Reporter,
};

#[derive(Parser, Debug)]
#[command(
    name = "fincantatem",
    about = "Run a Rust program and explain its panic",
    long_about = "Runs the program with RUST_BACKTRACE=1. If it panics, the panic and its backtrace\n\
                  are turned into a failure context and analyzed by the configured model.\n\
                  The endpoint is read from FI_PRESET, FI_API_URL, FI_MODEL and FI_API_KEY.",
    version
)]
struct Args {
    /// Inference preset (openrouter, openai), or a custom endpoint name used with FI_API_URL
    #[arg(long)]
    preset: Option<String>,

    /// Include the full source of each frame instead of snippets
    #[arg(long)]
    full_source: bool,

    /// Do not include local variables in the prompt
    #[arg(long)]
    no_locals: bool,

    /// Continue with an interactive chat after the analysis
    #[arg(long)]
    chat: bool,

    /// Redact likely secrets and e-mail addresses from the prompt
    #[arg(long)]
    cautious: bool,

    /// Ask for a plain-text answer without markdown
    #[arg(long)]
    plain: bool,

    /// Directory for chat exports
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

impl Args {
    fn report_options(&self) -> ReportOptions {
        let mut options = ReportOptions::default()
            .with_render_mode(if self.full_source {
                RenderMode::FullSource
            } else {
                RenderMode::Snippet
            })
            .with_capture_locals(!self.no_locals)
            .with_chat(self.chat)
            .with_cautious(self.cautious)
            .with_markdown(!self.plain)
            .with_export_dir(self.export_dir.clone());
        if let Some(preset) = &self.preset {
            options = options.with_preset(preset.clone());
        }
        options
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("fincantatem: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<u8, FincantatemError> {
    let program = cli::run_program(&args.command)?;
    let code = cli::exit_code(program.status);

    let Some(report) = parse_panic_report(&program.stderr) else {
        return Ok(code);
    };

    let outcome = Reporter::from_options(args.report_options()).and_then(|reporter| {
        reporter
            .without_traceback_echo()
            .report_panic(&report, &mut PlainTextInterface::stdio())
    });
    if let Err(error) = outcome {
        eprintln!("fincantatem: could not analyze the panic: {error}");
    }
    Ok(code)
}
