use std::{env, fs, process};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mix::{assemble, Machine, MachineConfig};

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  #[cfg(feature = "trace_computation")]
  info!("Computation Tracing ENABLED");

  let path = match env::args().nth(1) {
    Some(path) => path,
    None       => {
      eprintln!("Usage: mix <file.mixal>");
      process::exit(2);
    }
  };

  let text = match fs::read_to_string(&path) {
    Ok(text) => text,
    Err(e)   => {
      eprintln!("{}: {}", path, e);
      process::exit(2);
    }
  };

  let assembly = assemble(&text);
  for diagnostic in assembly.diagnostics.iter() {
    eprintln!("{}: {}", path, diagnostic);
  }
  if !assembly.succeeded {
    process::exit(1);
  }

  let entry =
    assembly.entry
            .or_else(|| assembly.symbols.get("START").filter(|v| *v >= 0).map(|v| v as usize))
            .unwrap_or(0);

  let mut machine = Machine::with_memory(&assembly.memory, MachineConfig::from_env());
  let outcome = machine.run(entry);

  for anomaly in machine.anomalies() {
    eprintln!("warning: {}", anomaly);
  }
  println!("{}", machine);

  match outcome {
    Ok(steps) => info!("{} instructions, {} time units", steps, machine.clock()),
    Err(e)    => {
      error!("{}", e);
      eprintln!("error: {}", e);
      process::exit(1);
    }
  }
}
