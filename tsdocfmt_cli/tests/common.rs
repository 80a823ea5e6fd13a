#![allow(dead_code)]

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const UNFORMATTED: &str = "/**\n * Adds two numbers.\n * @param {number} a the first\n */\nexport \
                               function add(a: number) {}\n";

pub const FORMATTED: &str = "/**\n * Adds two numbers.\n *\n * @param a - the first\n *\n * \
                             @internal\n */\nexport function add(a: number) {}\n";

pub fn tsdocfmt_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("tsdocfmt"));
	cmd.env("NO_COLOR", "1");
	cmd
}
