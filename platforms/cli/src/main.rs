use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tursim::{Halt, Machine, Program, ProgramLoader, Snapshot, Step};

/// Exit code used when the machine is still running at the deadline.
const EXIT_NOT_HALTED: u8 = 2;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  tursim-cli --program programs/binary-increment.tm
  echo '011 2 0 1 0 L 0 0 0 1 L 1' | tursim-cli --json")]
struct Cli {
    /// The program file to execute. Read from stdin when omitted.
    #[clap(short, long)]
    program: Option<PathBuf>,

    /// Give up waiting for a halt after this many milliseconds
    #[clap(short, long)]
    timeout: Option<u64>,

    /// Step from the foreground and print every configuration
    #[clap(short = 'd', long)]
    trace: bool,

    /// Print the final configuration as JSON
    #[clap(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let program = match load_program(&cli) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let machine = match program.machine() {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let deadline = cli.timeout.map(Duration::from_millis);
    let halted = if cli.trace {
        trace(&machine, deadline)
    } else {
        run(&machine, deadline)
    };

    let snapshot = machine.snapshot();
    if cli.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", snapshot.tape_string());
    }

    if halted {
        ExitCode::SUCCESS
    } else if machine.failed() {
        eprintln!("Machine worker failed before halting.");
        ExitCode::FAILURE
    } else {
        eprintln!("Machine did not halt within the timeout.");
        ExitCode::from(EXIT_NOT_HALTED)
    }
}

/// Loads the program from the `--program` file, or from stdin when it is piped.
fn load_program(cli: &Cli) -> Result<Program, String> {
    if let Some(path) = &cli.program {
        ProgramLoader::load_program(path).map_err(|e| e.to_string())
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        ProgramLoader::load_program_from_string(&buffer).map_err(|e| e.to_string())
    } else {
        Err("No program given. Use --program <FILE> or pipe a program via stdin.".to_string())
    }
}

/// Lets the machine's worker run it and waits for the halt.
fn run(machine: &Machine, timeout: Option<Duration>) -> bool {
    info!(machine = machine.id(), "running");
    machine.set_running(true);
    machine.wait_halted(timeout)
}

/// Steps the machine from this thread, printing the configuration after every step.
fn trace(machine: &Machine, timeout: Option<Duration>) -> bool {
    let start = Instant::now();
    print_snapshot(&machine.snapshot());

    loop {
        if timeout.is_some_and(|t| start.elapsed() >= t) {
            return false;
        }

        match machine.step() {
            Step::Continue => print_snapshot(&machine.snapshot()),
            Step::Halt(halt) => {
                // A boundary halt still applied its write.
                if halt == Halt::Boundary {
                    print_snapshot(&machine.snapshot());
                }
                println!("\nMachine halted ({:?}).\n", halt);
                return true;
            }
        }
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "Step: {}, State: {}, Tape: {}, Cursor: {}",
        snapshot.steps,
        snapshot.state,
        snapshot.tape_string(),
        snapshot.cursor
    );
}
