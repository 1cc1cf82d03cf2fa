use crate::{BucketViewError, BucketViewResult};

use clap::Parser;
use std::path::PathBuf;

/// Environment variable holding the connection token for `--print-tree`.
pub const TOKEN_ENV: &str = "BUCKET_VIEW_TOKEN";

// https://stackoverflow.com/questions/74068168/clap-rs-not-printing-colors-during-help
fn get_styles() -> clap::builder::Styles {
    let cyan = anstyle::Color::Ansi(anstyle::AnsiColor::Cyan);
    let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
    let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);

    clap::builder::Styles::styled()
        .placeholder(anstyle::Style::new().fg_color(Some(yellow)))
        .usage(anstyle::Style::new().fg_color(Some(cyan)).bold())
        .header(
            anstyle::Style::new()
                .fg_color(Some(cyan))
                .bold()
                .underline(),
        )
        .literal(anstyle::Style::new().fg_color(Some(green)))
}

// https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template
const APPLET_TEMPLATE: &str = "\
{before-help}
{about-with-newline}
{usage-heading} {usage}

{all-args}
{after-help}";

const EX1: &str = r#" bucket-view --root /data/store"#;
const EX2: &str = r#" bucket-view --root /data/store --bucket sales --token-in-clipboard"#;
const EX3: &str = r#" BUCKET_VIEW_TOKEN=secret bucket-view --root /data/store --bucket sales --print-tree"#;

/// Command-line arguments for the Bucket View application.
#[derive(Parser, Debug, Clone)]
#[command(
    // Read from `Cargo.toml`.
    author, version, about,
    long_about = None,
    next_line_help = true,
    help_template = APPLET_TEMPLATE,
    styles=get_styles(),
    after_help = format!("EXAMPLES:\n{EX1}\n{EX2}\n{EX3}")
)]
pub struct Arguments {
    /// Bucket name pre-filled in the connect dialog.
    #[arg(
        short = 'b',
        long,
        value_name = "BUCKET",
        help = "Bucket to browse (pre-fills the connect dialog)",
        long_help = "Name of the bucket to browse. Objects are addressed as s3://BUCKET/...\n\
        Required with --print-tree.",
        value_parser = validate_bucket_name
    )]
    pub bucket: Option<String>,

    /// Maximum number of rows fetched for a preview. [Default: 1000]
    #[arg(
        short = 'l',
        long,
        value_name = "ROWS",
        default_value_t = 1000,
        help = "Preview row limit (0 = no limit)",
        long_help = "Maximum number of rows fetched when previewing a file.\n\
        The total row count is always shown next to the preview. Use 0 to fetch every row."
    )]
    pub limit: u32,

    /// Headless mode: print the bucket tree markup and exit.
    #[arg(
        short = 'p',
        long,
        help = "Print the bucket tree as HTML and exit (no window)",
        long_help = "Runs the discovery query and writes the tree markup to stdout.\n\
        The token is read from the BUCKET_VIEW_TOKEN environment variable.",
        action = clap::ArgAction::SetTrue,
        requires = "bucket"
    )]
    pub print_tree: bool,

    /// Directory playing the object store: bucket `b` is the sub-directory `ROOT/b`.
    #[arg(
        short = 'r',
        long,
        value_name = "ROOT",
        default_value = ".",
        help = "Directory holding one sub-directory per bucket",
        long_help = "Root of the object store.\n\
        The object s3://b/a/x.csv is read from ROOT/b/a/x.csv."
    )]
    pub root: PathBuf,

    /// Connection token for headless mode. Never logged.
    #[arg(
        long,
        env = TOKEN_ENV,
        hide_env_values = true,
        value_name = "TOKEN",
        help = "Connection token for --print-tree",
    )]
    pub token: Option<String>,

    /// Pre-fill the token field from the system clipboard.
    #[arg(
        short = 'c',
        long,
        help = "Pre-fill the token field from the clipboard",
        long_help = "Reads the clipboard once when the connect dialog opens.\n\
        If the clipboard cannot be read, the dialog asks for the token to be pasted manually.",
        action = clap::ArgAction::SetTrue
    )]
    pub token_in_clipboard: bool,
}

impl Arguments {
    /// Build `Arguments` struct.
    pub fn build() -> Arguments {
        Arguments::parse()
    }

    /// The preview row limit, `None` meaning no limit.
    pub fn row_limit(&self) -> Option<u32> {
        Some(self.limit).filter(|&n| n > 0)
    }
}

/// clap validator for '--bucket': one path segment, no separators.
fn validate_bucket_name(name: &str) -> BucketViewResult<String> {
    let name = name.trim();
    let reason = if name.is_empty() {
        Some("Bucket name must not be empty")
    } else if name.contains('/') {
        Some("Bucket name must not contain '/'")
    } else if name == "." || name == ".." {
        Some("Bucket name must not be '.' or '..'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BucketViewError::InvalidArgument {
            arg_name: "--bucket".to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(name.to_string()),
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
