mod common;

use tsdocfmt_cli::SAMPLE_CONFIG;
use tsdocfmt_core::AnyEmptyResult;
use tsdocfmt_core::FormatOptions;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tsdocfmt_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created config file"));

	let content = std::fs::read_to_string(tmp.path().join("tsdocfmt.toml"))?;
	assert_eq!(content, SAMPLE_CONFIG);

	Ok(())
}

#[test]
fn init_creates_valid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tsdocfmt_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let options = FormatOptions::load(tmp.path())?.ok_or("config should exist")?;
	assert_eq!(options.print_width, 80);
	assert_eq!(options.default_release_tag(), Some("@internal".to_string()));

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	let existing = tmp.path().join(".config/tsdocfmt.toml");
	std::fs::write(&existing, "print_width = 100\n")?;

	common::tsdocfmt_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert!(!tmp.path().join("tsdocfmt.toml").exists());
	assert_eq!(std::fs::read_to_string(&existing)?, "print_width = 100\n");

	Ok(())
}
