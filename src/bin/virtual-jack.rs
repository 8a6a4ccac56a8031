// Virtual Jack CLI
// Loads the emulated jack and serves its control files until interrupted

use std::io::BufRead;
use std::path::PathBuf;
#[cfg(feature = "uinput")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "uinput")]
use std::sync::Arc;

use clap::Parser;

use jack_core::{default_settings_content, ControlFile, MockRegistry, Settings, VirtualJack};

/// Emulated headset jack for exercising audio routing without hardware
#[derive(Parser, Debug)]
#[command(name = "virtual-jack")]
#[command(version)]
#[command(about = "Emulated audio jack: EV_SW input device plus h2w switch", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/virtual-jack/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the class/ tree, overrides [paths] root
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// Print a settings template and exit
    #[arg(long)]
    print_default_config: bool,

    /// Use an in-memory registry and read "<attr> <payload>" lines from stdin
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load_default()?,
    };
    if let Some(root) = &args.root {
        settings.set_root(root);
    }
    Ok(settings)
}

fn print_settings(settings: &Settings) {
    match settings.source_path() {
        Some(path) => println!("Settings: {}", path.display()),
        None => println!("Settings: built-in defaults"),
    }
    println!("  input  = {}", settings.input_name());
    let switches: Vec<&str> = settings.input_switches().iter().map(|s| s.as_ref()).collect();
    println!("  switches = {}", switches.join(", "));
    println!("  switch = {}", settings.switch_name());
    println!("  root   = {}", settings.root().display());
}

/// Split a dry-run line into its control file and payload
fn parse_dry_run_line(line: &str) -> Option<(ControlFile, &str)> {
    let line = line.trim_start();
    let (attr, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    ControlFile::from_attr_name(attr).map(|file| (file, payload))
}

fn run_dry(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let registry = MockRegistry::new();
    let journal = registry.journal();
    let mut jack = VirtualJack::load(registry, settings);

    println!("Dry run: write 'test_input <code> <value>' or 'test_state <value>', Ctrl+D to finish");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_dry_run_line(&line) {
            Some((file, payload)) => {
                jack.store(file, payload);
            }
            None => eprintln!("Unknown control file in '{}'", line.trim()),
        }
    }

    jack.unload();
    for op in journal.ops() {
        println!("{:?}", op);
    }
    Ok(())
}

#[cfg(feature = "uinput")]
fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    use jack_core::UinputRegistry;

    let running = Arc::new(AtomicBool::new(true));
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let running = running.clone();
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                log::info!("Received signal, shutting down");
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    let mut jack = VirtualJack::load(UinputRegistry::new(settings.root()), settings);
    for file in [ControlFile::TestInput, ControlFile::TestState] {
        if let Some(path) = jack.registry().control_path(file) {
            println!("{}: {}", file, path.display());
        }
    }
    println!("virtual-jack is running. Press Ctrl+C to exit.");

    let result = serve(&mut jack, &running);
    jack.unload();
    result
}

#[cfg(feature = "uinput")]
fn serve(
    jack: &mut VirtualJack<jack_core::UinputRegistry>,
    running: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    while running.load(Ordering::SeqCst) {
        let writes = jack.registry_mut().poll_controls(100)?;
        for write in writes {
            jack.store(write.file, &write.data);
        }
    }
    Ok(())
}

#[cfg(not(feature = "uinput"))]
fn run(_settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    Err("virtual-jack was built without the 'uinput' feature; use --dry-run".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", default_settings_content());
        return Ok(());
    }

    init_logging(args.verbose);
    let settings = load_settings(&args)?;

    if args.check_config {
        print_settings(&settings);
        println!("Configuration is valid");
        return Ok(());
    }

    if args.dry_run {
        return run_dry(&settings);
    }

    run(&settings)
}
