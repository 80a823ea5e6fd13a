use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TsdocError {
	#[error(transparent)]
	#[diagnostic(code(tsdocfmt::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tsdocfmt::config_parse),
		help("check that tsdocfmt.toml is valid TOML and only uses supported keys")
	)]
	ConfigParse(String),

	#[error("unterminated fenced code block opened on body line {line}")]
	#[diagnostic(
		code(tsdocfmt::unterminated_fence),
		help("close the fence with a matching ``` or ~~~ line")
	)]
	UnterminatedFence { line: usize },

	#[error("unterminated inline tag `{{@{name}` at byte {offset}")]
	#[diagnostic(
		code(tsdocfmt::unterminated_inline_tag),
		help("inline tags must be closed with `}}`")
	)]
	UnterminatedInlineTag { name: String, offset: usize },

	#[error("declaration context unavailable: {0}")]
	#[diagnostic(code(tsdocfmt::context))]
	Context(String),

	#[error("failed to format embedded `{language}` snippet: {reason}")]
	#[diagnostic(code(tsdocfmt::embedded_format))]
	EmbeddedFormat { language: String, reason: String },

	#[error("failed to render comment: {0}")]
	#[diagnostic(code(tsdocfmt::render))]
	Render(String),
}

impl TsdocError {
	/// Returns `true` for errors raised by the structured comment parser.
	pub fn is_parse_error(&self) -> bool {
		matches!(
			self,
			Self::UnterminatedFence { .. } | Self::UnterminatedInlineTag { .. }
		)
	}

	pub fn embedded(language: impl Into<String>, reason: impl ToString) -> Self {
		Self::EmbeddedFormat {
			language: language.into(),
			reason: reason.to_string(),
		}
	}
}

pub type TsdocResult<T> = Result<T, TsdocError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
