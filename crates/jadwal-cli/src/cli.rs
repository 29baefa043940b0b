use clap::{Args, Parser, Subcommand};
use jadwal_core::models::{AttendanceState, ScheduleStatus, WeekParity};

/// Class schedules, session materialization and calendars for schools and masjids
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tenant ID to operate on (defaults to `default_tenant` from config,
    /// or the only tenant when exactly one exists)
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage tenants
    Tenant(TenantCommand),
    /// Manage class schedules
    Schedule(ScheduleCommand),
    /// Manage weekly rules of a schedule
    Rule(RuleCommand),
    /// Materialize class sessions for a date or date range
    Ensure(EnsureCommand),
    /// Show projected class occurrences without creating sessions
    Calendar(CalendarCommand),
    /// Inspect and update materialized sessions
    Session(SessionCommand),
}

// ============================================================================
// Tenants
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct TenantCommand {
    #[command(subcommand)]
    pub action: TenantAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TenantAction {
    /// Register a tenant
    Add {
        /// Display name
        name: String,
        /// IANA timezone (defaults to `default_timezone` from config)
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List tenants
    List,
    /// Change a tenant's timezone
    SetTimezone {
        /// Tenant ID
        id: String,
        /// IANA timezone; omit together with --clear to use the fallback offset
        #[arg(required_unless_present = "clear")]
        timezone: Option<String>,
        #[arg(long, conflicts_with = "timezone")]
        clear: bool,
    },
}

// ============================================================================
// Schedules
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct ScheduleCommand {
    #[command(subcommand)]
    pub action: ScheduleAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScheduleAction {
    /// Create a schedule, optionally with a first weekly rule
    Add(AddScheduleCommand),
    /// List schedules
    List {
        /// Only schedules of this class section
        #[arg(long)]
        section: Option<String>,
    },
    /// Show a schedule with its rules and upcoming dates
    Show {
        /// Schedule ID or slug
        schedule: String,
        /// Number of upcoming dates to preview
        #[arg(long, short, default_value = "5")]
        preview: usize,
    },
    /// Edit a schedule
    Edit(EditScheduleCommand),
    /// Delete a schedule and its rules; materialized sessions are kept
    Delete {
        /// Schedule ID or slug
        schedule: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AddScheduleCommand {
    /// Class section ID the schedule drives
    #[arg(long)]
    pub section: String,
    /// First date of validity (YYYY-MM-DD or natural language)
    #[arg(long)]
    pub from: String,
    /// Last date of validity, inclusive
    #[arg(long)]
    pub to: String,
    /// Human-readable identifier, unique per tenant
    #[arg(long)]
    pub slug: Option<String>,
    #[arg(long)]
    pub status: Option<ScheduleStatus>,
    /// Day of week for a first weekly rule (mon..sun or 1-7)
    #[arg(long = "on", requires_all = ["start", "end"])]
    pub day: Option<String>,
    /// Local start time of the first rule (HH:MM)
    #[arg(long, requires = "day")]
    pub start: Option<String>,
    /// Local end time of the first rule (HH:MM)
    #[arg(long, requires = "day")]
    pub end: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditScheduleCommand {
    /// Schedule ID or slug
    pub schedule: String,
    #[arg(long)]
    pub slug: Option<String>,
    #[arg(long, conflicts_with = "slug")]
    pub slug_clear: bool,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub status: Option<ScheduleStatus>,
    /// Enable or disable materialization
    #[arg(long)]
    pub active: Option<bool>,
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct RuleCommand {
    #[command(subcommand)]
    pub action: RuleAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RuleAction {
    /// Add a weekly rule to a schedule
    Add {
        /// Schedule ID or slug
        schedule: String,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Edit a rule's recurrence or metadata
    Edit(EditRuleCommand),
    /// Delete a rule; materialized sessions are kept
    Delete {
        /// Rule ID
        id: String,
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RuleArgs {
    /// Day of week (mon..sun or 1-7)
    #[arg(long = "on")]
    pub day: String,
    /// Local start time (HH:MM)
    #[arg(long)]
    pub start: String,
    /// Local end time (HH:MM)
    #[arg(long)]
    pub end: String,
    /// Repeat every N weeks
    #[arg(long)]
    pub every: Option<u32>,
    /// Skip the first N weeks
    #[arg(long)]
    pub offset: Option<u32>,
    #[arg(long)]
    pub parity: Option<WeekParity>,
    /// Month-week ordinals, e.g. "1,3"
    #[arg(long)]
    pub weeks: Option<String>,
    /// Fire on the last such weekday of each month
    #[arg(long)]
    pub last_week: bool,
    #[arg(long)]
    pub room: Option<String>,
    #[arg(long)]
    pub teacher: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditRuleCommand {
    /// Rule ID
    pub id: String,
    #[arg(long)]
    pub every: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
    #[arg(long)]
    pub parity: Option<WeekParity>,
    #[arg(long)]
    pub weeks: Option<String>,
    #[arg(long, conflicts_with = "weeks")]
    pub weeks_clear: bool,
    #[arg(long)]
    pub last_week: Option<bool>,
    #[arg(long)]
    pub room: Option<String>,
    #[arg(long, conflicts_with = "room")]
    pub room_clear: bool,
    #[arg(long)]
    pub teacher: Option<String>,
    #[arg(long, conflicts_with = "teacher")]
    pub teacher_clear: bool,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, conflicts_with = "notes")]
    pub notes_clear: bool,
    #[arg(long)]
    pub active: Option<bool>,
}

// ============================================================================
// Materialization and calendar
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct EnsureCommand {
    /// Single date to materialize
    #[arg(long, conflicts_with_all = ["from", "to"], required_unless_present_all = ["from", "to"])]
    pub date: Option<String>,
    /// Range start, inclusive
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Range end, inclusive
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Only this schedule (ID or slug); otherwise every active schedule
    #[arg(long, conflicts_with = "section")]
    pub schedule: Option<String>,
    /// Only schedules of this class section
    #[arg(long)]
    pub section: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CalendarCommand {
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub to: String,
    #[arg(long)]
    pub section: Option<String>,
    /// Schedule ID or slug
    #[arg(long)]
    pub schedule: Option<String>,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionAction {
    /// List materialized sessions
    List {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        section: Option<String>,
        /// Schedule ID or slug
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Cancel a session
    Cancel {
        /// Session ID
        id: String,
    },
    /// Set a session's attendance state
    Attendance {
        /// Session ID
        id: String,
        state: AttendanceState,
    },
}
