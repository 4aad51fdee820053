use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nowplaying", version, about = "Now-playing programme scheduler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project store in the current directory
    Init,
    /// Load a programme from text and start its first activity
    Load {
        /// File with `title;start;duration` lines (reads stdin when omitted or `-`)
        file: Option<PathBuf>,
    },
    /// Append an activity to the programme
    Add {
        /// Activity title
        title: String,
        /// Duration as minutes or minutes:seconds
        duration: String,
        /// Start time (HH:MM), required for the first activity
        #[arg(long)]
        start: Option<String>,
    },
    /// End the running activity and start the next one
    Next,
    /// End the running activity without starting another
    End,
    /// Pause or resume the running activity
    Pause,
    /// Start an earlier activity again
    Restart {
        /// Position as shown by `status` (1-based)
        position: usize,
    },
    /// Choose which activity `next` will start
    Skip {
        /// Position as shown by `status` (1-based)
        position: usize,
    },
    /// Edit the running activity
    Edit {
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New start time (HH:MM); the current label is kept when omitted
        #[arg(long)]
        start: Option<String>,
        /// New duration (minutes or minutes:seconds)
        #[arg(long)]
        duration: Option<String>,
    },
    /// End the programme and clear every activity
    Clear,
    /// Show the current activity, countdown and upcoming items
    Status,
    /// Print the programme as `title;start;duration` text
    Export,
    /// List saved programmes
    Programmes,
    /// Save the current programme under a name
    Save {
        /// Programme name
        name: String,
    },
    /// Load a saved programme and start it now
    Open {
        /// Programme name
        name: String,
    },
    /// Delete a saved programme
    Delete {
        /// Programme name
        name: String,
    },
    /// Show an announcement on every display
    Announce {
        /// Announcement text
        text: Option<String>,
        /// Minutes to keep it up (default 1)
        #[arg(long)]
        minutes: Option<u32>,
        /// Remove the current announcement
        #[arg(long)]
        clear: bool,
    },
    /// Show or change display preferences
    Prefs {
        /// Render only the countdown on display surfaces
        #[arg(long)]
        always_fullscreen: Option<bool>,
    },
    /// Launch the interactive control panel
    Control,
    /// Launch a read-only display that follows the programme
    Display,
}
