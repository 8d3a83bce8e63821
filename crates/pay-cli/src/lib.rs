//! # pay-cli
//!
//! Command-line checkout client.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `create` | Create a payment and present its checkout page |
//! | `status <payment_id>` | Fetch one status snapshot |
//! | `poll <payment_id>` | Wait until the payment settles |
//! | `link` | Fetch a checkout link and open it |
//!
//! "Presenting" a checkout page from a terminal means printing the URL;
//! see [`terminal::TerminalPresenter`].

pub mod cli;
pub mod handlers;
pub mod state;
pub mod terminal;

pub use cli::{Cli, Commands};
pub use state::AppState;
