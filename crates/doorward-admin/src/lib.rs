//! Remote admin link.
//!
//! A line-oriented text protocol over a serial transport. Bytes are echoed
//! as they arrive, assembled into lines by [`LineAssembler`], parsed into an
//! [`AdminCommand`] and executed by an [`AdminSession`] against the
//! configuration store. Every command gets exactly one reply line starting
//! with `OK` or `ERR`.
//!
//! | Command | Needs login | Effect |
//! |---------|-------------|--------|
//! | `LOGIN <password>` | no | open the session |
//! | `NEWPASS <pin>` | yes | set the door PIN |
//! | `ADMINPASS <password>` | yes | set the admin password |
//! | `ADDID <hex>` | yes | authorize a card |
//! | `DELID <hex>` | yes | revoke a card |
//! | `LISTIDS` | yes | list authorized cards |
//! | `STATUS` | yes | report controller state |
//! | `UNLOCK` | yes | not implemented |
//!
//! There is no logout and no session timeout.

pub mod command;
pub mod error;
pub mod line;
pub mod link;
pub mod session;

pub use command::AdminCommand;
pub use error::{AdminError, Result};
pub use line::LineAssembler;
pub use link::AdminLink;
pub use session::{AdminSession, Reply, SystemStatus};
