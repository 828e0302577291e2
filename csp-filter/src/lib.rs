//! Separates signal from noise in incoming CSP violation reports.
//!
//! A large share of violation reports is not caused by the policy of the reporting site, but by
//! browser extensions, injected vendor scripts and non-standard URI schemes. Such reports are
//! rejected with the following checks, applied to every record of a request:
//!
//! * blocked URI (reject if it starts with any prefix of the [`Blocklist`])
//! * document URI (reject if it does not start with `http`)
#![warn(missing_docs)]

mod blocklist;
mod validate;

pub use self::blocklist::*;
pub use self::validate::*;
