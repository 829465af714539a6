/// Camera authorization status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Turn a non-granted status into the error `initialize` surfaces. Prompting
/// the user happens outside this crate.
pub fn require_granted(status: PermissionStatus) -> Result<(), crate::errors::CameraError> {
    if status.is_granted() {
        Ok(())
    } else {
        Err(crate::errors::CameraError::PermissionDenied(format!(
            "camera access is {}",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_granted() {
        assert!(require_granted(PermissionStatus::Granted).is_ok());
        for status in [
            PermissionStatus::Denied,
            PermissionStatus::NotDetermined,
            PermissionStatus::Restricted,
        ] {
            let err = require_granted(status).unwrap_err();
            assert_eq!(err.code(), "permissionDenied");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PermissionStatus::NotDetermined.to_string(), "not_determined");
    }
}
