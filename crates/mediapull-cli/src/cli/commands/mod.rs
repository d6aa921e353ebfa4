//! CLI command handlers. Each command is in its own file.

mod add;
mod cookies;
mod generate;
mod info;
mod list;
mod open;
mod pause;
mod remove;
mod resume;
mod status;

pub use add::{run_add, AddArgs};
pub use cookies::run_cookies;
pub use generate::{run_completions, run_manpage};
pub use info::{run_info, run_update_engine};
pub use list::run_list;
pub use open::{run_open, run_open_root};
pub use pause::run_pause;
pub use remove::run_remove;
pub use resume::run_resume;
pub use status::run_status;
