use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use commands::pipeline::PipelineArgs;
use commands::{CmdResult, GlobalArgs};
use convoy::context::{Reporter, Verbosity};
use convoy::log_status;

mod commands;
mod output;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "convoy")]
#[command(version = VERSION)]
#[command(about = "Run the configured site build and publish tasks in order")]
struct Cli {
    /// Enable debugging output
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ./convoy.cfg)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a configuration file holding every default, then exit
    #[arg(long)]
    default_config: bool,

    /// Print the loaded configuration and every enabled task's settings, then exit
    #[arg(long)]
    debug_config: bool,

    /// Skip a task by its tag (repeatable)
    #[arg(short, long, value_name = "TAG")]
    skip: Vec<String>,

    /// List the enabled tasks in run order, then exit
    #[arg(short, long)]
    list: bool,

    /// Print the result as a JSON envelope instead of progress messages
    #[arg(long)]
    json: bool,
}

fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        eprintln!("\n...interrupted by user, exiting.");
        std::process::exit(1);
    });
    if let Err(e) = installed {
        log_status!("convoy", "Could not install interrupt handler: {}", e);
    }
}

fn install_panic_hook(debug: bool) {
    panic::set_hook(Box::new(move |info| {
        if debug {
            eprintln!("Unexpected error: {}", info);
            eprintln!("{}", std::backtrace::Backtrace::force_capture());
            return;
        }
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        eprintln!(
            "Unexpected error: {}. Run with --debug for details.",
            message
        );
    }));
}

fn finish<T: Serialize>(
    result: CmdResult<T>,
    global: &GlobalArgs,
    reporter: &mut Reporter,
    render: fn(&T) -> Option<String>,
) -> i32 {
    let debug = global.verbosity == Verbosity::Debug;
    match result {
        Ok((data, exit_code)) => {
            if global.json {
                if let Err(e) = output::print_json_result(&Ok(data)) {
                    eprintln!("{}", output::render_error(&e, debug));
                    return 1;
                }
            } else if let Some(text) = render(&data) {
                reporter.print(text);
            }
            exit_code
        }
        Err(err) => {
            if global.json {
                let _ = output::print_json_result::<()>(&Err(err));
            } else {
                eprintln!("{}", output::render_error(&err, debug));
            }
            1
        }
    }
}

fn run(cli: Cli) -> ExitCode {
    let global = GlobalArgs {
        verbosity: Verbosity::from_flags(cli.verbose, cli.debug),
        config: cli.config,
        json: cli.json,
    };
    let mut reporter = global.reporter();
    if cli.debug {
        reporter.print("Enabling debugging output.");
    }
    if cli.verbose {
        reporter.print("Enabling verbose output.");
    }

    let exit_code = if cli.default_config {
        finish(
            commands::config::default_config(&mut reporter),
            &global,
            &mut reporter,
            |out| Some(out.text().trim_end().to_string()),
        )
    } else if cli.debug_config {
        finish(
            commands::config::debug_config(&global, &mut reporter),
            &global,
            &mut reporter,
            |out| Some(out.text().trim_end().to_string()),
        )
    } else {
        let args = PipelineArgs {
            skip: cli.skip,
            list: cli.list,
        };
        finish(
            commands::pipeline::run(&args, &global, &mut reporter),
            &global,
            &mut reporter,
            |_| None,
        )
    };

    ExitCode::from(exit_code_to_u8(exit_code))
}

fn main() -> ExitCode {
    install_interrupt_handler();
    let cli = Cli::parse();
    install_panic_hook(cli.debug);

    match panic::catch_unwind(move || run(cli)) {
        Ok(code) => code,
        Err(_) => ExitCode::from(1),
    }
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
