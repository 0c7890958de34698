use clap::{Parser, Subcommand};
use disview_core::{FlattenOptions, flatten, opcode_counts, tree};
use disview_tui::{App, PaneLayout, Settings};
use miette::IntoDiagnostic;
use miette::miette;
use std::io::{self, BufWriter, Read, Write};
use std::{fs, path::Path, path::PathBuf};

use crate::config::{Config, Layout};

#[derive(Parser, Debug)]
#[command(name = "disview")]
#[command(author = "Takahiro Sato. <harehare1110@gmail.com>")]
#[command(version = "0.1.0")]
#[command(after_help = "Examples:\n\n\
    To browse a snippet interactively:\n\
    $ disview snippet.py\n\n\
    To print the disassembly with numeric opcodes:\n\
    $ disview dis --opcodes snippet.py\n\n\
    To print the syntax tree of stdin:\n\
    $ echo 'x = 1' | disview ast")]
#[command(
    about = "disview shows a snippet's bytecode and syntax tree side by side.",
    long_about = None
)]
pub struct Cli {
    #[clap(flatten)]
    display: DisplayArgs,

    #[clap(subcommand)]
    commands: Option<Commands>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// Write log messages to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Source file to open in the viewer
    file: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct DisplayArgs {
    /// Show the numeric opcode next to each operation name
    #[arg(long)]
    opcodes: bool,

    /// Show specialised instructions
    #[arg(long)]
    adaptive: bool,

    /// Start with the syntax tree pane hidden
    #[arg(long)]
    no_ast: bool,

    /// Pane layout
    #[arg(long, value_enum)]
    layout: Option<Layout>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the disassembly of a file ("-" or no file reads stdin)
    Dis {
        /// Show the numeric opcode next to each operation name
        #[arg(long)]
        opcodes: bool,
        /// Show specialised instructions
        #[arg(long)]
        adaptive: bool,
        file: Option<PathBuf>,
    },
    /// Print the syntax tree of a file as an indented outline
    Ast { file: Option<PathBuf> },
    /// Print how often each operation appears in a file
    Counts {
        /// Count specialised instructions
        #[arg(long)]
        adaptive: bool,
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let config = Config::load().into_diagnostic()?;
        log::debug!("config: {config:?}");

        match &self.commands {
            Some(Commands::Dis {
                opcodes,
                adaptive,
                file,
            }) => {
                let program = disview_lang::compile(&read_input(file.as_deref())?)?;
                let options = FlattenOptions {
                    show_opcodes: *opcodes || config.show_opcodes,
                    adaptive: *adaptive || config.adaptive,
                };
                print(&flatten(&program, options).to_string())
            }
            Some(Commands::Ast { file }) => {
                let module = disview_lang::parse(&read_input(file.as_deref())?)?;
                print(&tree::build(&module.syntax()).outline())
            }
            Some(Commands::Counts { adaptive, file }) => {
                let program = disview_lang::compile(&read_input(file.as_deref())?)?;
                let counts = opcode_counts(&program, *adaptive || config.adaptive);
                let width = counts
                    .iter()
                    .map(|(name, _)| name.len())
                    .max()
                    .unwrap_or_default();
                let table: String = counts
                    .iter()
                    .map(|(name, count)| format!("{:<width$} {:>6}\n", name, count))
                    .collect();
                print(&table)
            }
            None => self.launch(&config),
        }
    }

    fn settings(&self, config: &Config) -> Settings {
        let layout = match self.display.layout.unwrap_or(config.layout) {
            Layout::Horizontal => PaneLayout::Horizontal,
            Layout::Vertical => PaneLayout::Vertical,
        };

        Settings {
            options: FlattenOptions {
                show_opcodes: self.display.opcodes || config.show_opcodes,
                adaptive: self.display.adaptive || config.adaptive,
            },
            show_ast: config.show_ast && !self.display.no_ast,
            layout,
        }
    }

    fn launch(&self, config: &Config) -> miette::Result<()> {
        let settings = self.settings(config);

        let mut app = match &self.file {
            Some(path) => {
                let content = read_file(path)?;
                App::with_file(content, path.display().to_string(), settings)
            }
            None => App::new(String::new(), settings),
        };

        app.run()
    }
}

fn read_file(path: &Path) -> miette::Result<String> {
    if !path.exists() {
        return Err(miette!("File not found: {}", path.display()));
    }

    fs::read_to_string(path).into_diagnostic()
}

fn read_input(file: Option<&Path>) -> miette::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => read_file(path),
        _ => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input).into_diagnostic()?;
            Ok(input)
        }
    }
}

fn print(text: &str) -> miette::Result<()> {
    let stdout = io::stdout();
    let mut handle = BufWriter::new(stdout.lock());
    handle.write_all(text.as_bytes()).into_diagnostic()?;
    handle.flush().into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::defaults(&["disview"], Config::default(), true, PaneLayout::Horizontal)]
    #[case::no_ast_flag(&["disview", "--no-ast"], Config::default(), false, PaneLayout::Horizontal)]
    #[case::config_layout(
        &["disview"],
        Config { layout: Layout::Vertical, ..Default::default() },
        true,
        PaneLayout::Vertical
    )]
    #[case::flag_overrides_layout(
        &["disview", "--layout", "horizontal"],
        Config { layout: Layout::Vertical, show_ast: false, ..Default::default() },
        false,
        PaneLayout::Horizontal
    )]
    fn test_settings(
        #[case] args: &[&str],
        #[case] config: Config,
        #[case] show_ast: bool,
        #[case] layout: PaneLayout,
    ) {
        let settings = Cli::parse_from(args).settings(&config);
        assert_eq!(settings.show_ast, show_ast);
        assert_eq!(settings.layout, layout);
    }

    #[test]
    fn test_flags_enable_options() {
        let config = Config {
            adaptive: true,
            ..Default::default()
        };
        let settings = Cli::parse_from(["disview", "--opcodes"]).settings(&config);
        assert_eq!(
            settings.options,
            FlattenOptions {
                show_opcodes: true,
                adaptive: true
            }
        );
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_file(Path::new("no/such/snippet.py")).is_err());
    }
}
