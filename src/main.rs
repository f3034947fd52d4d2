//! sconsole - console control from the command line
//!
//! A thin front end over the simple-console library, handy for checking what
//! the library sees in a given terminal and for scripting colors and titles.
//!
//! # Quick Start
//!
//! ```text
//! sconsole                   # Report console state
//! sconsole palette           # Show all 16 colors
//! sconsole color yellow blue # Yellow on blue from now on
//! sconsole reset             # Back to the configured colors
//! ```

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use simple_console::config::{self, ConsoleConfig};
use simple_console::{system_console, Color, Console, ConsoleDevice, SystemConsole};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to do with the console
#[derive(Debug, PartialEq)]
enum Command {
    Info,
    Palette,
    Color { foreground: Color, background: Option<Color> },
    Reset,
    Clear,
    ClearLine,
    Title(String),
    Cursor(bool),
    Move { x: i16, y: i16 },
    Config,
    Help,
    Version,
}

fn print_help() {
    eprintln!("sconsole {} - console colors, cursor and title", VERSION);
    eprintln!();
    eprintln!("Usage: sconsole [COMMAND]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  info                  Report console state (default)");
    eprintln!("  palette               Show all 16 colors");
    eprintln!("  color <FG> [BG]       Set foreground and optionally background");
    eprintln!("  reset                 Restore the configured fallback colors");
    eprintln!("  clear                 Clear the screen buffer");
    eprintln!("  clear-line            Clear from the cursor to the end of the line");
    eprintln!("  title <TEXT>          Set the window title");
    eprintln!("  cursor show|hide      Show or hide the cursor");
    eprintln!("  move <X> <Y>          Move the cursor (zero-based)");
    eprintln!("  config                Print the effective configuration");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Colors: a name or a code 0-15");
    eprintln!("  black dark-blue dark-green dark-cyan dark-red dark-magenta dark-yellow gray");
    eprintln!("  dark-gray blue green cyan red magenta yellow white");
    eprintln!();
    eprintln!("Configuration: ~/.simple-console/config.toml (or ${})", config::CONFIG_ENV);
}

fn parse_color(arg: Option<&String>, what: &str) -> Result<Color, String> {
    let arg = arg.ok_or_else(|| format!("Missing {} color", what))?;
    arg.parse()
}

fn parse_coord(arg: Option<&String>, what: &str) -> Result<i16, String> {
    let arg = arg.ok_or_else(|| format!("Missing {} coordinate", what))?;
    arg.parse()
        .map_err(|_| format!("Invalid {} coordinate: {}", what, arg))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(first) = args.first() else {
        return Ok(Command::Info);
    };

    let command = match first.as_str() {
        "-h" | "--help" => Command::Help,
        "-v" | "--version" => Command::Version,
        "info" => Command::Info,
        "palette" => Command::Palette,
        "color" => Command::Color {
            foreground: parse_color(args.get(1), "foreground")?,
            background: args.get(2).map(|arg| arg.parse()).transpose()?,
        },
        "reset" => Command::Reset,
        "clear" => Command::Clear,
        "clear-line" => Command::ClearLine,
        "title" => {
            let text = args[1..].join(" ");
            if text.is_empty() {
                return Err("Missing title text".to_string());
            }
            Command::Title(text)
        }
        "cursor" => match args.get(1).map(String::as_str) {
            Some("show") => Command::Cursor(true),
            Some("hide") => Command::Cursor(false),
            _ => return Err("Expected 'cursor show' or 'cursor hide'".to_string()),
        },
        "move" => Command::Move {
            x: parse_coord(args.get(1), "x")?,
            y: parse_coord(args.get(2), "y")?,
        },
        "config" => Command::Config,
        arg => {
            return Err(format!("Unknown argument: {}. Use -h for help.", arg));
        }
    };

    let expected = match command {
        Command::Color { background: Some(_), .. } | Command::Move { .. } => 3,
        Command::Color { .. } | Command::Cursor(_) => 2,
        Command::Title(_) => args.len(),
        _ => 1,
    };
    if args.len() > expected {
        return Err(format!("Unexpected argument: {}", args[expected]));
    }

    Ok(command)
}

/// Log to ~/.simple-console/sconsole.log; RUST_LOG overrides the configured level
fn init_logging(config: &ConsoleConfig) {
    let log_path = config::data_dir()
        .map(|dir| dir.join("sconsole.log"))
        .unwrap_or_else(|| PathBuf::from("sconsole.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn print_info(console: &SystemConsole) {
    println!("real console:   {}", console.has_real_console());
    if let Some(how) = console.acquisition() {
        println!("output handle:  {:?}", how);
    }
    match console.size() {
        Ok(size) => println!("window size:    {}x{}", size.width, size.height),
        Err(e) => println!("window size:    unavailable ({})", e),
    }
    match console.cursor_position() {
        Ok(pos) => println!("cursor:         {},{}", pos.x, pos.y),
        Err(e) => println!("cursor:         unavailable ({})", e),
    }
    match console.color() {
        Ok(attrs) => println!("colors:         {}", attrs),
        Err(e) => println!("colors:         unavailable ({})", e),
    }
    println!("cursor visible: {}", console.is_cursor_visible());
}

fn print_palette(console: &SystemConsole) -> anyhow::Result<()> {
    if !console.has_real_console() {
        info!("No real console, printing palette without colors");
        for color in Color::ALL {
            println!("{:>2} {}", color.code(), color);
        }
        return Ok(());
    }

    for color in Color::ALL {
        console.set_foreground(color.code())?;
        print!("{:>2} {:<14}", color.code(), color.name());
        io::stdout().flush()?;
        console.reset_color()?;
        console.set_background(color.code())?;
        let label = if color.is_bright() { Color::Black } else { Color::White };
        console.set_foreground(label.code())?;
        print!(" {:^14} ", color.name());
        io::stdout().flush()?;
        console.reset_color()?;
        println!();
    }
    Ok(())
}

/// Each run is a fresh process whose captured default is whatever an earlier
/// run left behind, so reset writes the configured colors instead.
fn restore_colors<D: ConsoleDevice>(
    console: &Console<D>,
    config: &ConsoleConfig,
) -> simple_console::Result<()> {
    console.set_color(config.fallback_attributes().bits())
}

fn run(console: &SystemConsole, command: Command, config: &ConsoleConfig) -> anyhow::Result<()> {
    match command {
        Command::Info => print_info(console),
        Command::Palette => print_palette(console)?,
        Command::Color { foreground, background } => {
            if let Some(background) = background {
                console
                    .set_background(background.code())
                    .context("Failed to set background")?;
            }
            console
                .set_foreground(foreground.code())
                .context("Failed to set foreground")?;
        }
        Command::Reset => restore_colors(console, config).context("Failed to reset colors")?,
        Command::Clear => console.clear().context("Failed to clear screen")?,
        Command::ClearLine => console.clear_line().context("Failed to clear line")?,
        Command::Title(text) => console.set_title(&text).context("Failed to set title")?,
        Command::Cursor(visible) => console
            .show_cursor(visible)
            .context("Failed to change cursor visibility")?,
        Command::Move { x, y } => console
            .set_cursor(x, y)
            .with_context(|| format!("Failed to move cursor to {},{}", x, y))?,
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Help | Command::Version => bail!("help and version are handled before startup"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            eprintln!("sconsole {}", VERSION);
            return Ok(());
        }
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = ConsoleConfig::load();
    init_logging(&config);
    info!("sconsole {} running {:?}", VERSION, command);

    let console = system_console(&config);
    run(&console, command, &config)
}
