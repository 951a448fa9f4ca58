use crate::models::RunConfig;
use clap::Parser;
use std::path::PathBuf;

/// Builds the dynamic, color-aware full help string at runtime.
fn build_help_string() -> &'static str {
    // This function acts as a mini-renderer for our semantic help template.
    // It replaces placeholders like `<title>` with colored/styled text.

    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let template = t!("cli.help.template");

    // Define styles. If colors are disabled, they are empty strings.
    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan (for flags)
    let hi = if use_colors { "\x1b[1m" } else { "" }; // Bold (for shell names)
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan (for commands)
    let dim = if use_colors { "\x1b[2m" } else { "" }; // Dim
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted_string = template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<hi>", hi)
        .replace("</hi>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted_string.into_boxed_str())
}

/// run-shell: finds and runs the user's preferred shell, with an optional fallback.
#[derive(Parser, Debug, Default)]
#[command(
    name = "run-shell",
    author,
    version,
    about,
    // Use `help_template` to take full control of the output.
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Find and run `xonsh` instead of the user's default shell.
    #[arg(long = "prefer-xonsh", short = 'x', visible_alias = "xonsh")]
    pub prefer_xonsh: bool,

    /// Print verbose information.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// After xonsh exits, fall back to running `zsh`.
    #[arg(long = "fallback-to-zsh", short = 'f', visible_alias = "fallback")]
    pub fallback_to_zsh: bool,

    /// The python binary used to run xonsh.
    #[arg(long = "python-bin", value_name = "PATH")]
    pub python_bin: Option<PathBuf>,

    /// Read settings from this file instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The flag layer of the run configuration, before the config file is merged in.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            prefer_xonsh: self.prefer_xonsh,
            verbose: self.verbose,
            fallback_to_zsh: self.fallback_to_zsh,
            python_bin: self.python_bin.clone(),
        }
    }
}
