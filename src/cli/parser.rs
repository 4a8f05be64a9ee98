use clap::{Parser, Subcommand};

/// Command-line interface definition for shoplog
/// Workshop labor time tracking on SQLite
#[derive(Parser)]
#[command(
    name = "shoplog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Workshop labor time tracking: start, pause, resume and finish work on repair tasks",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Manage the worker directory
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },

    /// Manage work orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },

    /// Manage tasks of a work order
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage hour-cost calculations (hourly rates per period)
    Rate {
        #[command(subcommand)]
        action: RateAction,
    },

    /// Start timing a task
    Start {
        /// Task id
        task: String,

        #[arg(long = "worker", short = 'w', help = "Worker starting the task")]
        worker: String,

        #[arg(long, help = "Print the refreshed view as JSON")]
        json: bool,
    },

    /// Pause a running time log
    Pause {
        /// Time log id
        log: i64,

        #[arg(long = "worker", short = 'w', help = "Worker owning the log")]
        worker: String,

        #[arg(long, help = "Print the refreshed view as JSON")]
        json: bool,
    },

    /// Resume the paused time log on a task
    Resume {
        /// Task id
        task: String,

        #[arg(long = "worker", short = 'w', help = "Worker resuming the task")]
        worker: String,

        #[arg(long, help = "Print the refreshed view as JSON")]
        json: bool,
    },

    /// Finish a time log and close the task
    Finish {
        /// Time log id
        log: i64,

        #[arg(long = "task", short = 't', help = "Task the log belongs to")]
        task: String,

        #[arg(long = "worker", short = 'w', help = "Worker owning the log")]
        worker: String,

        #[arg(long, help = "Print the refreshed view as JSON")]
        json: bool,
    },

    /// Show a worker's active log and pending tasks
    Active {
        #[arg(long = "worker", short = 'w')]
        worker: String,

        #[arg(long)]
        json: bool,
    },

    /// List a worker's pending tasks
    Pending {
        #[arg(long = "worker", short = 'w')]
        worker: String,

        #[arg(long)]
        json: bool,
    },

    /// Show who is working on what right now
    Board {
        #[arg(long)]
        json: bool,
    },

    /// Labor cost of a work order, as of now
    Cost {
        /// Work order id
        order: String,

        #[arg(long, help = "Expected income, to compute the margin")]
        income: Option<f64>,

        #[arg(long, default_value_t = 0.0, help = "Parts cost (used with --income)")]
        parts: f64,

        #[arg(long, help = "Amount already billed, to show the billing total")]
        billed: Option<f64>,

        #[arg(long, help = "Valued labor amount, to compare with the real cost")]
        valued: Option<f64>,

        #[arg(long)]
        json: bool,
    },

    /// Keep a worker panel (or the board) refreshed until Ctrl-C
    Watch {
        #[arg(
            long = "worker",
            short = 'w',
            help = "Watch one worker; without it the board is watched"
        )]
        worker: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WorkerAction {
    /// Add or update a worker
    Add {
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "operator")]
        role: String,

        #[arg(long = "non-productive", help = "Exclude from productive labor")]
        non_productive: bool,

        #[arg(long, help = "Productivity percentage (0-100)")]
        productivity: Option<u8>,
    },

    /// List workers
    List,
}

#[derive(Subcommand)]
pub enum OrderAction {
    /// Open a work order
    Add {
        id: String,

        #[arg(long, help = "Workshop id (default: from configuration)")]
        workshop: Option<String>,

        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to a work order
    Add {
        id: String,

        #[arg(long = "order", short = 'o')]
        order: String,

        #[arg(long = "worker", short = 'w', help = "Assigned worker")]
        worker: Option<String>,

        #[arg(long = "type", default_value = "general")]
        task_type: String,

        #[arg(long = "hours", default_value_t = 0.0, help = "Estimated hours")]
        hours: f64,
    },

    /// Reopen a finished task
    Reopen { id: String },

    /// List tasks
    List {
        #[arg(long = "order", short = 'o')]
        order: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RateAction {
    /// Record the hourly rate for a period
    Set {
        /// Period (YYYY-MM)
        period: String,

        /// Hourly rate
        rate: f64,

        #[arg(long, help = "Workshop id (default: from configuration)")]
        workshop: Option<String>,
    },

    /// List recorded hourly rates
    List,
}
