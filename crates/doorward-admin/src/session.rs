//! Admin session: login gate and command execution.

use std::fmt;

use doorward_core::{AlarmVolume, CardUid};
use doorward_hardware::FlashRegion;
use doorward_storage::ConfigStore;
use tracing::{info, warn};

use crate::command::AdminCommand;
use crate::error::{AdminError, Result};

/// Controller state reported by `STATUS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub state: String,
    pub failed_attempts: u8,
    pub alarm_volume: AlarmVolume,
}

/// Reply line for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(String),
    Err(AdminError),
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok(message) if message.is_empty() => f.write_str("OK"),
            Reply::Ok(message) => write!(f, "OK {}", message),
            Reply::Err(err) => write!(f, "ERR {}", err),
        }
    }
}

/// Login state of the admin link.
///
/// Starts logged out. A successful `LOGIN` opens the session for good;
/// a failed one does not close an open session.
#[derive(Debug, Default)]
pub struct AdminSession {
    logged_in: bool,
}

impl AdminSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Execute one line and produce its reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorward_admin::{AdminSession, SystemStatus};
    /// use doorward_core::AlarmVolume;
    /// use doorward_hardware::mock::MockFlash;
    /// use doorward_storage::ConfigStore;
    ///
    /// let mut store = ConfigStore::open(MockFlash::new());
    /// let status = SystemStatus {
    ///     state: "Armed".to_string(),
    ///     failed_attempts: 0,
    ///     alarm_volume: AlarmVolume::BASE,
    /// };
    /// let mut session = AdminSession::new();
    ///
    /// let reply = session.handle_line("ADDID 1234", &mut store, &status);
    /// assert_eq!(reply.to_string(), "ERR login required");
    ///
    /// session.handle_line("LOGIN 123456", &mut store, &status);
    /// let reply = session.handle_line("ADDID 1234", &mut store, &status);
    /// assert_eq!(reply.to_string(), "OK added 00001234");
    /// ```
    pub fn handle_line<F: FlashRegion>(
        &mut self,
        line: &str,
        store: &mut ConfigStore<F>,
        status: &SystemStatus,
    ) -> Reply {
        match self.execute(line, store, status) {
            Ok(message) => Reply::Ok(message),
            Err(err) => Reply::Err(err),
        }
    }

    fn execute<F: FlashRegion>(
        &mut self,
        line: &str,
        store: &mut ConfigStore<F>,
        status: &SystemStatus,
    ) -> Result<String> {
        if !self.logged_in && line.split_whitespace().next() != Some("LOGIN") {
            warn!("Admin command rejected, not logged in");
            return Err(AdminError::SessionRequired);
        }

        let command = AdminCommand::parse(line)?;
        info!(command = command.name(), "Admin command");

        match command {
            AdminCommand::Login { password } => {
                if store.verify_admin_password(password) {
                    self.logged_in = true;
                    info!("Admin session opened");
                    Ok("logged in".to_string())
                } else {
                    warn!("Admin login failed");
                    Err(AdminError::LoginFailed)
                }
            }
            AdminCommand::NewPin { pin } => {
                store.update_pin(pin)?;
                Ok("PIN updated".to_string())
            }
            AdminCommand::AdminPass { password } => {
                store.update_admin_password(password)?;
                Ok("admin password updated".to_string())
            }
            AdminCommand::AddId { hex } => {
                let uid = CardUid::parse_hex(hex)?;
                store.add_identifier(uid)?;
                Ok(format!("added {uid}"))
            }
            AdminCommand::DelId { hex } => {
                let uid = CardUid::parse_hex(hex)?;
                store.remove_identifier(uid)?;
                Ok(format!("removed {uid}"))
            }
            AdminCommand::ListIds => {
                let ids = store.list_identifiers();
                let mut message = format!("{} ids", ids.len());
                for uid in ids {
                    message.push(' ');
                    message.push_str(&uid.to_string());
                }
                Ok(message)
            }
            AdminCommand::Status => Ok(format!(
                "state={} attempts={} volume={} ids={} storage={}",
                status.state,
                status.failed_attempts,
                status.alarm_volume,
                store.identifier_count(),
                if store.is_in_sync() { "synced" } else { "diverged" },
            )),
            AdminCommand::Unlock => Err(AdminError::NotImplemented { command: "UNLOCK" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorward_hardware::mock::MockFlash;
    use doorward_storage::StorageError;
    use rstest::rstest;

    fn status() -> SystemStatus {
        SystemStatus {
            state: "Armed".to_string(),
            failed_attempts: 1,
            alarm_volume: AlarmVolume::BASE,
        }
    }

    fn logged_in() -> (AdminSession, ConfigStore<MockFlash>) {
        let mut store = ConfigStore::open(MockFlash::new());
        let mut session = AdminSession::new();
        assert!(session.handle_line("LOGIN 123456", &mut store, &status()).is_ok());
        (session, store)
    }

    fn run(session: &mut AdminSession, store: &mut ConfigStore<MockFlash>, line: &str) -> String {
        session.handle_line(line, store, &status()).to_string()
    }

    #[rstest]
    #[case("NEWPASS 4321")]
    #[case("ADMINPASS x")]
    #[case("ADDID 01")]
    #[case("DELID 01")]
    #[case("LISTIDS")]
    #[case("STATUS")]
    #[case("UNLOCK")]
    #[case("BOGUS")]
    fn test_privileged_commands_need_login(#[case] line: &str) {
        let mut store = ConfigStore::open(MockFlash::new());
        let mut session = AdminSession::new();

        assert_eq!(run(&mut session, &mut store, line), "ERR login required");
        assert!(store.verify_admin_password("123456"));
    }

    #[test]
    fn test_login() {
        let mut store = ConfigStore::open(MockFlash::new());
        let mut session = AdminSession::new();

        assert_eq!(run(&mut session, &mut store, "LOGIN 12345"), "ERR login failed");
        assert!(!session.is_logged_in());
        assert_eq!(run(&mut session, &mut store, "LOGIN"), "ERR LOGIN needs an argument");
        assert_eq!(run(&mut session, &mut store, "LOGIN 123456"), "OK logged in");
        assert!(session.is_logged_in());

        // A later failure does not close the session.
        run(&mut session, &mut store, "LOGIN wrong");
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_newpass() {
        let (mut session, mut store) = logged_in();

        assert_eq!(run(&mut session, &mut store, "NEWPASS 4321"), "OK PIN updated");
        assert!(store.door_pin().matches(b"4321"));

        let reply = run(&mut session, &mut store, "NEWPASS 12345");
        assert!(reply.starts_with("ERR"), "{reply}");
        assert!(store.door_pin().matches(b"4321"));
    }

    #[test]
    fn test_adminpass_changes_login() {
        let (mut session, mut store) = logged_in();
        assert_eq!(
            run(&mut session, &mut store, "ADMINPASS s3cret"),
            "OK admin password updated"
        );

        let mut fresh = AdminSession::new();
        assert_eq!(run(&mut fresh, &mut store, "LOGIN 123456"), "ERR login failed");
        assert_eq!(run(&mut fresh, &mut store, "LOGIN s3cret"), "OK logged in");
    }

    #[test]
    fn test_adminpass_too_long() {
        let (mut session, mut store) = logged_in();
        let reply = run(&mut session, &mut store, "ADMINPASS 0123456789");
        assert!(reply.starts_with("ERR"), "{reply}");
    }

    #[test]
    fn test_addid_strips_whitespace() {
        let (mut session, mut store) = logged_in();

        assert_eq!(
            run(&mut session, &mut store, "ADDID DE AD BE EF"),
            "OK added DEADBEEF"
        );
        assert!(store.is_authorized(0xDEAD_BEEF));
    }

    #[rstest]
    #[case("ADDID 0")]
    #[case("ADDID xyz")]
    #[case("ADDID 123456789")]
    #[case("DELID 0")]
    #[case("DELID 00000000")]
    fn test_invalid_identifiers(#[case] line: &str) {
        let (mut session, mut store) = logged_in();
        let reply = session.handle_line(line, &mut store, &status());
        assert!(matches!(
            reply,
            Reply::Err(AdminError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_addid_duplicate() {
        let (mut session, mut store) = logged_in();
        run(&mut session, &mut store, "ADDID 1A2B");

        let reply = session.handle_line("ADDID 1a2b", &mut store, &status());
        assert!(matches!(
            reply,
            Reply::Err(AdminError::Storage(StorageError::DuplicateIdentifier(_)))
        ));
    }

    #[test]
    fn test_delid() {
        let (mut session, mut store) = logged_in();
        run(&mut session, &mut store, "ADDID CAFE");

        assert_eq!(run(&mut session, &mut store, "DELID cafe"), "OK removed 0000CAFE");
        assert_eq!(
            run(&mut session, &mut store, "DELID CAFE"),
            "ERR Identifier 0000CAFE not found"
        );
    }

    #[test]
    fn test_listids() {
        let (mut session, mut store) = logged_in();
        assert_eq!(run(&mut session, &mut store, "LISTIDS"), "OK 0 ids");

        run(&mut session, &mut store, "ADDID 2");
        run(&mut session, &mut store, "ADDID 1");
        assert_eq!(
            run(&mut session, &mut store, "LISTIDS"),
            "OK 2 ids 00000002 00000001"
        );
    }

    #[test]
    fn test_status() {
        let (mut session, mut store) = logged_in();
        run(&mut session, &mut store, "ADDID 2");

        assert_eq!(
            run(&mut session, &mut store, "STATUS"),
            "OK state=Armed attempts=1 volume=10% ids=1 storage=synced"
        );
    }

    #[test]
    fn test_status_reports_divergence() {
        let (mut session, mut store) = logged_in();
        store.flash_mut().set_fail_program(true);
        run(&mut session, &mut store, "ADDID 2");

        assert!(run(&mut session, &mut store, "STATUS").ends_with("storage=diverged"));
    }

    #[test]
    fn test_unlock_not_implemented() {
        let (mut session, mut store) = logged_in();
        assert_eq!(run(&mut session, &mut store, "UNLOCK"), "ERR UNLOCK not implemented");
    }

    #[test]
    fn test_unknown_command() {
        let (mut session, mut store) = logged_in();
        assert_eq!(run(&mut session, &mut store, "HELP"), "ERR unknown command \"HELP\"");
    }
}
