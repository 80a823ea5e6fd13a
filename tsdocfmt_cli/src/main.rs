use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tsdocfmt_cli::Commands;
use tsdocfmt_cli::SAMPLE_CONFIG;
use tsdocfmt_cli::TsdocfmtCli;
use tsdocfmt_core::CONFIG_FILE_CANDIDATES;
use tsdocfmt_core::Diagnostics;
use tsdocfmt_core::FormatOptions;
use tsdocfmt_core::FormatResult;
use tsdocfmt_core::NoopDiagnostics;
use tsdocfmt_core::TracingDiagnostics;
use tsdocfmt_core::TsdocError;
use tsdocfmt_core::check_project;
use tsdocfmt_core::write_updates;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,cyan) => {
		if color_enabled() {
			format!("{}", $text.cyan())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TsdocfmtCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	USE_COLOR.store(use_color, Ordering::Relaxed);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	if args.debug {
		init_logger(use_color);
	}

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Check { diff }) => run_check(&args, diff),
		Some(Commands::Write) => run_write(&args),
		None => {
			eprintln!("No subcommand specified. Run `tsdocfmt --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<TsdocError>() {
			Ok(error) => {
				let report: miette::Report = (*error).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Send `tsdocfmt` logs at debug level to stderr.
fn init_logger(use_color: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("tsdocfmt_core=debug,tsdocfmt_cli=debug"));
	let fmt_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_ansi(use_color)
		.compact();

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt_layer)
		.init();
}

fn resolve_root(args: &TsdocfmtCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn diagnostics(args: &TsdocfmtCli) -> &'static dyn Diagnostics {
	if args.debug {
		&TracingDiagnostics
	} else {
		&NoopDiagnostics
	}
}

fn load_options(root: &Path) -> Result<FormatOptions, Box<dyn std::error::Error>> {
	let options = FormatOptions::load(root)?;
	if options.is_none() {
		tracing::debug!(root = %root.display(), "no config file found, using defaults");
	}
	Ok(options.unwrap_or_default())
}

fn format_project(args: &TsdocfmtCli) -> Result<(PathBuf, FormatResult), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let options = load_options(&root)?;
	let result = check_project(&root, &options, diagnostics(args))?;
	Ok((root, result))
}

fn run_init(args: &TsdocfmtCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = FormatOptions::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join(CONFIG_FILE_CANDIDATES[0]);
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created config file: {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Adjust {} to match your project", config_path.display());
	println!("  2. Run `tsdocfmt check --diff` to preview changes");
	println!("  3. Run `tsdocfmt write` to format comments");

	Ok(())
}

fn run_check(args: &TsdocfmtCli, show_diff: bool) -> Result<(), Box<dyn std::error::Error>> {
	let (root, result) = format_project(args)?;

	if result.is_ok() {
		println!(
			"Check passed: {} file(s) are formatted.",
			result.checked_count
		);
		return Ok(());
	}

	eprintln!("Check failed.");
	eprintln!();
	for file in &result.changed {
		let rel = make_relative(&file.path, &root);
		eprintln!("  {rel}");
		if show_diff {
			print_diff(&rel, &file.original, &file.formatted);
		}
	}
	eprintln!();
	eprintln!(
		"{} of {} file(s) need formatting. Run `tsdocfmt write` to fix.",
		result.changed.len(),
		result.checked_count
	);

	process::exit(1);
}

fn run_write(args: &TsdocfmtCli) -> Result<(), Box<dyn std::error::Error>> {
	let (root, result) = format_project(args)?;

	if result.is_ok() {
		println!("All {} file(s) are already formatted.", result.checked_count);
		return Ok(());
	}

	write_updates(&result)?;
	for file in &result.changed {
		println!("  {}", make_relative(&file.path, &root));
	}
	println!("Formatted {} file(s).", result.changed.len());

	Ok(())
}

fn print_diff(name: &str, original: &str, formatted: &str) {
	let diff = TextDiff::from_lines(original, formatted);
	let unified = diff
		.unified_diff()
		.context_radius(3)
		.header(name, name)
		.to_string();

	for line in unified.lines() {
		let line = if line.starts_with("+++") || line.starts_with("---") {
			line.to_string()
		} else if line.starts_with('+') {
			colored!(line, green)
		} else if line.starts_with('-') {
			colored!(line, red)
		} else if line.starts_with("@@") {
			colored!(line, cyan)
		} else {
			line.to_string()
		};
		eprintln!("    {line}");
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
