//! Admin command parsing.

use crate::error::{AdminError, Result};

/// One parsed admin command, borrowing its arguments from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand<'a> {
    Login { password: &'a str },
    NewPin { pin: &'a str },
    AdminPass { password: &'a str },
    /// Hex identifier; may still contain whitespace.
    AddId { hex: &'a str },
    DelId { hex: &'a str },
    ListIds,
    Status,
    Unlock,
}

impl<'a> AdminCommand<'a> {
    /// Parse a line. The command word is case-sensitive.
    ///
    /// `LOGIN`, `NEWPASS` and `ADMINPASS` take the next space-separated
    /// token. `ADDID` and `DELID` take the rest of the line so that
    /// `ADDID DE AD BE EF` works.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorward_admin::AdminCommand;
    ///
    /// assert_eq!(
    ///     AdminCommand::parse("ADDID DE AD BE EF").unwrap(),
    ///     AdminCommand::AddId { hex: "DE AD BE EF" }
    /// );
    /// assert!(AdminCommand::parse("login 123456").is_err());
    /// ```
    pub fn parse(line: &'a str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(' ') {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "LOGIN" => AdminCommand::Login {
                password: token("LOGIN", rest)?,
            },
            "NEWPASS" => AdminCommand::NewPin {
                pin: token("NEWPASS", rest)?,
            },
            "ADMINPASS" => AdminCommand::AdminPass {
                password: token("ADMINPASS", rest)?,
            },
            "ADDID" => AdminCommand::AddId {
                hex: remainder("ADDID", rest)?,
            },
            "DELID" => AdminCommand::DelId {
                hex: remainder("DELID", rest)?,
            },
            "LISTIDS" => AdminCommand::ListIds,
            "STATUS" => AdminCommand::Status,
            "UNLOCK" => AdminCommand::Unlock,
            _ => return Err(AdminError::UnknownCommand(word.to_string())),
        };
        Ok(command)
    }

    /// Command word, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::Login { .. } => "LOGIN",
            AdminCommand::NewPin { .. } => "NEWPASS",
            AdminCommand::AdminPass { .. } => "ADMINPASS",
            AdminCommand::AddId { .. } => "ADDID",
            AdminCommand::DelId { .. } => "DELID",
            AdminCommand::ListIds => "LISTIDS",
            AdminCommand::Status => "STATUS",
            AdminCommand::Unlock => "UNLOCK",
        }
    }

    /// Whether the command is allowed before `LOGIN`.
    pub fn is_public(&self) -> bool {
        matches!(self, AdminCommand::Login { .. })
    }
}

fn token<'a>(command: &'static str, rest: &'a str) -> Result<&'a str> {
    rest.split(' ')
        .find(|t| !t.is_empty())
        .ok_or(AdminError::MissingArgument { command })
}

fn remainder<'a>(command: &'static str, rest: &'a str) -> Result<&'a str> {
    if rest.is_empty() {
        Err(AdminError::MissingArgument { command })
    } else {
        Ok(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("LOGIN 123456", AdminCommand::Login { password: "123456" })]
    #[case("LOGIN  abc extra", AdminCommand::Login { password: "abc" })]
    #[case("NEWPASS 4321", AdminCommand::NewPin { pin: "4321" })]
    #[case("ADMINPASS hunter2", AdminCommand::AdminPass { password: "hunter2" })]
    #[case("ADDID deadbeef", AdminCommand::AddId { hex: "deadbeef" })]
    #[case("DELID 0x1234 ", AdminCommand::DelId { hex: "0x1234" })]
    #[case("LISTIDS", AdminCommand::ListIds)]
    #[case("  STATUS", AdminCommand::Status)]
    #[case("UNLOCK", AdminCommand::Unlock)]
    fn test_parse(#[case] line: &str, #[case] expected: AdminCommand<'static>) {
        assert_eq!(AdminCommand::parse(line).unwrap(), expected);
    }

    #[rstest]
    #[case("LOGIN", "LOGIN")]
    #[case("NEWPASS ", "NEWPASS")]
    #[case("ADMINPASS", "ADMINPASS")]
    #[case("ADDID", "ADDID")]
    #[case("DELID   ", "DELID")]
    fn test_missing_argument(#[case] line: &str, #[case] command: &'static str) {
        assert_eq!(
            AdminCommand::parse(line),
            Err(AdminError::MissingArgument { command })
        );
    }

    #[rstest]
    #[case("status")]
    #[case("LOGINX 123")]
    #[case("STATUSES")]
    #[case("HELP")]
    fn test_unknown(#[case] line: &str) {
        assert!(matches!(
            AdminCommand::parse(line),
            Err(AdminError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_only_login_is_public() {
        assert!(AdminCommand::Login { password: "x" }.is_public());
        assert!(!AdminCommand::Status.is_public());
    }
}
