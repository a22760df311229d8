use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only depends on clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

/// Man pages and completion scripts under `$OUT_DIR/{man,completions}`.
fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR not set by Cargo");
    };
    let out_dir = Path::new(&out_dir);

    let mut cmd = cli::Cli::command();
    write_man_pages(&cmd, &out_dir.join("man"));
    write_completions(&mut cmd, &out_dir.join("completions"));
}

/// `cpi.1`, plus `cpi-<sub>.1` for every visible subcommand at any depth.
fn write_man_pages(root: &clap::Command, dir: &Path) {
    fs::create_dir_all(dir).unwrap_or_else(|e| panic!("create {}: {e}", dir.display()));

    let mut pending = vec![root.clone()];
    while let Some(cmd) = pending.pop() {
        let name = cmd.get_name().to_owned();
        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.clone().name(format!("{name}-{}", sub.get_name()))),
        );

        let mut page = Vec::new();
        clap_mangen::Man::new(cmd)
            .render(&mut page)
            .unwrap_or_else(|e| panic!("render man page `{name}`: {e}"));
        let path = dir.join(format!("{name}.1"));
        fs::write(&path, page).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    }
}

fn write_completions(cmd: &mut clap::Command, dir: &Path) {
    fs::create_dir_all(dir).unwrap_or_else(|e| panic!("create {}: {e}", dir.display()));
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, cmd, "cpi", dir)
            .unwrap_or_else(|e| panic!("write {shell} completions: {e}"));
    }
}
