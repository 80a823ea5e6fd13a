mod common;

use clap::Parser;
use predicates::prelude::PredicateBooleanExt;
use tsdocfmt_cli::Commands;
use tsdocfmt_cli::TsdocfmtCli;
use tsdocfmt_core::AnyEmptyResult;

#[test]
fn check_passes_when_formatted() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("add.ts"), common::FORMATTED)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("1 file(s) are formatted"));

	Ok(())
}

#[test]
fn check_fails_when_unformatted() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("add.ts"), common::UNFORMATTED)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("add.ts"))
		.stderr(predicates::str::contains("1 of 1 file(s) need formatting"));

	let content = std::fs::read_to_string(tmp.path().join("add.ts"))?;
	assert_eq!(content, common::UNFORMATTED, "check must not write files");

	Ok(())
}

#[test]
fn check_diff_shows_changes() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("add.ts"), common::UNFORMATTED)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("--- add.ts"))
		.stderr(predicates::str::contains("- * @param {number} a the first"))
		.stderr(predicates::str::contains("+ * @param a - the first"))
		.stderr(predicates::str::contains("+ * @internal"));

	Ok(())
}

#[test]
fn check_respects_gitignore_and_exclude() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join(".gitignore"), "build/\n")?;
	std::fs::create_dir_all(tmp.path().join("build"))?;
	std::fs::write(tmp.path().join("build/add.js"), common::UNFORMATTED)?;
	std::fs::create_dir_all(tmp.path().join("vendor"))?;
	std::fs::write(tmp.path().join("vendor/add.ts"), common::UNFORMATTED)?;
	std::fs::write(tmp.path().join("tsdocfmt.toml"), "exclude = [\"vendor/\"]\n")?;
	std::fs::write(tmp.path().join("readme.md"), common::UNFORMATTED)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("0 file(s) are formatted"));

	Ok(())
}

#[test]
fn check_reads_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("add.ts"), common::UNFORMATTED)?;
	std::fs::write(
		tmp.path().join(".tsdocfmt.toml"),
		"default_release_tag = false\nlegacy_compatibility = false\n",
	)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("+ *\n"))
		.stderr(predicates::str::contains("@internal").not());

	Ok(())
}

#[test]
fn check_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("tsdocfmt.toml"), "printWidth = 3\n")?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tsdocfmt::config_parse"));

	Ok(())
}

#[test]
fn check_debug_logs_skipped_comments() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("bad.ts"),
		"/**\n * Broken {@link Foo\n */\nexport const a = 1;\n",
	)?;

	common::tsdocfmt_cmd()
		.arg("check")
		.arg("--debug")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("comment left unformatted"));

	Ok(())
}

#[test]
fn check_diff_flag_parses() {
	let cli = TsdocfmtCli::parse_from(["tsdocfmt", "check", "--diff", "--no-color"]);
	assert!(cli.no_color);
	match cli.command {
		Some(Commands::Check { diff }) => assert!(diff),
		_ => panic!("expected Check command"),
	}

	let cli = TsdocfmtCli::parse_from(["tsdocfmt", "check"]);
	match cli.command {
		Some(Commands::Check { diff }) => assert!(!diff),
		_ => panic!("expected Check command"),
	}
}

#[test]
fn missing_subcommand_fails() {
	common::tsdocfmt_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));
}
