pub type GfallResult<T> = Result<T, GfallError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GfallErrorCategory {
    Success,
    FormatError,
    ReferentialError,
    IoSystemError,
    InternalError,
}

impl GfallErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::FormatError => 2,
            Self::ReferentialError => 3,
            Self::IoSystemError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::FormatError => "FormatError",
            Self::ReferentialError => "ReferentialError",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} [{}] {}", .category.as_str(), .placeholder, .message)]
pub struct GfallError {
    category: GfallErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl GfallError {
    pub fn new(
        category: GfallErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GfallErrorCategory::FormatError, placeholder, message)
    }

    pub fn referential(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GfallErrorCategory::ReferentialError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GfallErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GfallErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> GfallErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

#[cfg(test)]
mod tests {
    use super::{GfallError, GfallErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (GfallErrorCategory::Success, 0, "Success"),
            (GfallErrorCategory::FormatError, 2, "FormatError"),
            (GfallErrorCategory::ReferentialError, 3, "ReferentialError"),
            (GfallErrorCategory::IoSystemError, 4, "IoSystemError"),
            (GfallErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = GfallError::format("FORMAT.FIELD", "line 3: field 'loggf' is not numeric");

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [FORMAT.FIELD] line 3: field 'loggf' is not numeric"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
        assert_eq!(
            error.to_string(),
            "FormatError [FORMAT.FIELD] line 3: field 'loggf' is not numeric"
        );
    }

    #[test]
    fn referential_errors_use_their_own_category() {
        let error = GfallError::referential("REFERENCE.LEVEL_MISSING", "no level");
        assert_eq!(error.category(), GfallErrorCategory::ReferentialError);
        assert_eq!(error.placeholder(), "REFERENCE.LEVEL_MISSING");
        assert_eq!(error.message(), "no level");
    }
}
