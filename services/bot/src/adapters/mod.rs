pub mod presence;
pub mod slack;
pub mod slack_directory;
pub mod spreadsheet;

pub use presence::LivePresence;
pub use slack::SlackNotifier;
pub use slack_directory::SlackDirectory;
pub use spreadsheet::SpreadsheetExport;
