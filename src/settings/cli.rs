use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

/// One line typed into the shell, parsed without a binary name.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mint a sequential identifier for a new subject.
    Register,
    /// Issue a token pair for a subject.
    Login { subject: String },
    /// Resolve an access token to its subject.
    Verify { access_token: String },
    /// Revoke the token pair behind an access token.
    Logout { access_token: String },
    /// Trade a refresh token for a new pair.
    Refresh { refresh_token: String },
    /// Mint `count` identifiers concurrently for a day (YYYYMMDD, default today).
    Allocate {
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        day: Option<String>,
    },
    /// Read commands from stdin, one per line, against a single server.
    Shell,
}

impl Command {
    /// Commands that look up tokens issued by an earlier command.
    pub fn needs_earlier_state(&self) -> bool {
        matches!(
            self,
            Command::Verify { .. } | Command::Logout { .. } | Command::Refresh { .. }
        )
    }
}
