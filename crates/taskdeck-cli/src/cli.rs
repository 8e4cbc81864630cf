use clap::{Parser, Subcommand};
use taskdeck_core::tasks::UPCOMING_LIMIT;
use taskdeck_core::TaskFilter;

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Manage your tasks from the terminal")]
pub struct Cli {
    /// Backend URL, overriding TASKDECK_API_BASE_URL and the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the credential
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the stored credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List {
        #[arg(long, short, default_value_t = TaskFilter::All)]
        filter: TaskFilter,
    },
    /// Create a task
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        /// Due date, e.g. 2026-10-20 or 2026-10-20T17:00
        #[arg(long)]
        due: Option<String>,
    },
    /// Change a task's fields
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Mark a task completed
    Done { id: i64 },
    /// Mark a task pending again
    Undo { id: i64 },
    /// Delete a task
    Rm {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Show a month of due dates
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// List tasks that are due from now on, soonest first
    Upcoming {
        /// How many tasks to show
        #[arg(long, short = 'n', default_value_t = UPCOMING_LIMIT)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_filter() {
        let cli = Cli::try_parse_from(["taskdeck", "list", "--filter", "pending"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List {
                filter: TaskFilter::Pending
            }
        ));
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from(["taskdeck", "add", "Buy milk", "--due", "2026-10-20"])
            .unwrap();
        match cli.command {
            Command::Add { title, due, .. } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(due.as_deref(), Some("2026-10-20"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_upcoming_defaults_to_calendar_limit() {
        let cli = Cli::try_parse_from(["taskdeck", "upcoming"]).unwrap();
        assert!(matches!(cli.command, Command::Upcoming { limit: 5 }));
        let cli = Cli::try_parse_from(["taskdeck", "upcoming", "-n", "20"]).unwrap();
        assert!(matches!(cli.command, Command::Upcoming { limit: 20 }));
    }

    #[test]
    fn test_rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["taskdeck", "list", "--filter", "someday"]).is_err());
    }
}
