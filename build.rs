use clap::CommandFactory;
use clap_complete::{Generator, Shell};
use clap_mangen::Man;
use std::path::{Path, PathBuf};

// Shared with the binary so man pages and completions track the real flags
include!("src/cli/app.rs");

const BIN_NAME: &str = "ubiscan";

fn render_man(cmd: clap::Command, path: &Path) {
    let mut buf = Vec::new();
    Man::new(cmd).render(&mut buf).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn main() {
    let out_dir =
        PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| "target/man".to_string()));
    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir).unwrap();

    let cmd = Cli::command();
    render_man(cmd.clone(), &man_dir.join(format!("{BIN_NAME}.1")));

    // ubiscan-dump.1, ubiscan-completions.1
    for sub in cmd.get_subcommands() {
        let page = format!("{}-{}.1", BIN_NAME, sub.get_name());
        render_man(sub.clone(), &man_dir.join(page));
    }

    let completions_dir = out_dir.join("completions");
    std::fs::create_dir_all(&completions_dir).unwrap();

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
        let mut cmd = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
        std::fs::write(completions_dir.join(shell.file_name(BIN_NAME)), buf).unwrap();
    }

    println!("cargo:rerun-if-changed=src/cli/app.rs");
}
