use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

/// Sample config written by `tsdocfmt init`.
pub const SAMPLE_CONFIG: &str = "# tsdocfmt configuration\n# Every key is optional. The \
                                 values below are the defaults.\n\nprint_width = 80\ntab_width \
                                 = 2\n\n# Release tag inserted on exported declarations that have \
                                 none.\n# Set to \"\" or false to disable.\ndefault_release_tag = \
                                 \"@internal\"\nonly_exported_api = true\ninheritance_aware = \
                                 true\nrelease_tag_strategy = \"keep-first\"\n\n# Layout\nfenced_indent \
                                 = \"space\"\nalign_param_tags = false\nsplit_modifiers = \
                                 true\nnormalize_tag_order = false\n\n# Additional tags recognized \
                                 anywhere in a comment.\n# extra_tags = [\"@category\"]\n\n# \
                                 Gitignore-style patterns skipped by the CLI.\n# exclude = \
                                 [\"dist/\"]\n\n# [normalize_tags]\n# \"@desc\" = \"@remarks\"\n";

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Format TSDoc comments in TypeScript and JavaScript sources.",
	long_about = "tsdocfmt normalizes the documentation comments of a TypeScript or JavaScript \
	              project.\n\nIt rewrites legacy JSDoc annotations, keeps exactly one release tag \
	              per declaration and wraps comments to the configured width. Code outside of \
	              comments is never touched.\n\nQuick start:\n  tsdocfmt init   Create a \
	              tsdocfmt.toml\n  tsdocfmt check  Verify every comment is formatted\n  tsdocfmt \
	              write  Format comments in place"
)]
pub struct TsdocfmtCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Log every comment that is left unformatted and why.
	#[arg(long, global = true, default_value_t = false)]
	pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `tsdocfmt.toml` in the project root.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Check that every documentation comment is already formatted.
	///
	/// Exits with a non-zero status code if any file would change. Use
	/// `--diff` to see what would change.
	Check {
		/// Show a unified diff for each file that would change.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Format documentation comments and write the files in place.
	Write,
}
