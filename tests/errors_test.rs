#[cfg(test)]
mod error_tests {
    use crablens::commands::CommandError;
    use crablens::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_permission_denied() {
        let error = CameraError::PermissionDenied("Access denied".to_string());
        assert!(error.to_string().contains("Permission denied"));
        assert!(error.to_string().contains("Access denied"));
        assert_eq!(error.code(), "permissionDenied");
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::CaptureError("Display test".to_string());
        assert_eq!(format!("{}", error), "Capture error: Display test");
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::Busy("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Busy"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_every_code_is_distinct_camel_case() {
        let errors = vec![
            CameraError::PermissionDenied(String::new()),
            CameraError::DeviceNotFound(String::new()),
            CameraError::HardwareUnavailable(String::new()),
            CameraError::HardwareError(String::new()),
            CameraError::Busy(String::new()),
            CameraError::NotReady(String::new()),
            CameraError::NotRecording,
            CameraError::AlreadyRecording,
            CameraError::PolicyConfigError(String::new()),
            CameraError::CaptureError(String::new()),
            CameraError::InvalidArgument(String::new()),
            CameraError::ConfigError(String::new()),
            CameraError::Io(String::new()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        for code in &codes {
            assert!(code.chars().next().unwrap().is_ascii_lowercase());
            assert!(!code.contains('_'));
        }
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let error: CameraError = io.into();
        assert_eq!(error.code(), "io");
        assert!(error.to_string().contains("missing file"));
    }

    #[test]
    fn test_camera_error_is_std_error() {
        let error = CameraError::NotRecording;
        let as_error: &dyn Error = &error;
        assert!(as_error.source().is_none());
    }

    #[test]
    fn test_command_error_carries_code() {
        let error: CommandError = CameraError::DeviceNotFound("cam-9".into()).into();
        assert_eq!(error.code, "deviceNotFound");
        assert_eq!(error.message, "Camera device not found: cam-9");
        assert_eq!(error.to_string(), "deviceNotFound: Camera device not found: cam-9");

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "deviceNotFound");
    }
}
