//! User-facing notices.

use crate::Error;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short message meant for the person at the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    /// Creates an informational notice.
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Creates an error notice.
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Shown right before the flashing tool starts.
    pub fn flashing() -> Self {
        Self::info(
            "Flashing",
            "Flashing firmware... Please wait, this may take a few seconds.",
        )
    }

    /// Shown after a successful flash.
    pub fn flashed() -> Self {
        Self::info(
            "Success",
            "Firmware updated successfully!\nPlease reconnect the cable to the USB.",
        )
    }
}

impl From<&Error> for Notice {
    fn from(err: &Error) -> Self {
        match err {
            Error::Connection { .. } => {
                Notice::error("Connection Error", format!("Failed to connect:\n{}", err))
            }
            Error::InvalidPort(_) => {
                Notice::error("Error", "Please select a valid port before flashing.")
            }
            Error::ToolNotFound(tool) => Notice::error(
                "Error",
                format!("{} not found. Make sure it is installed or on PATH.", tool),
            ),
            Error::Flash(_) => Notice::error(
                "Error",
                format!(
                    "Failed to flash firmware ({}).\nMake sure your ESP32 is in bootloader mode.",
                    err
                ),
            ),
            _ => Notice::error("Error", err.to_string()),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlashFailure;

    #[test]
    fn test_error_notices() {
        let notice = Notice::from(&Error::InvalidPort("Select Port".into()));
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.body.contains("valid port"));

        let notice = Notice::from(&Error::ToolNotFound("esptool".into()));
        assert!(notice.body.starts_with("esptool not found"));

        let notice = Notice::from(&Error::Flash(FlashFailure::Exit(Some(2))));
        assert!(notice.body.contains("bootloader mode"));
        assert!(notice.body.contains("status 2"));
    }

    #[test]
    fn test_success_notice_mentions_reconnect() {
        let notice = Notice::flashed();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.body.contains("reconnect"));
    }
}
