use dropmark_core::Issue;

/// Notified of every error-severity issue, fatal or not.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, code: &str, issue: &Issue);
}

/// Notified of every warning-severity issue.
pub trait WarningSink: Send + Sync {
    fn on_warning(&self, code: &str, message: &str);
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &Issue) + Send + Sync,
{
    fn on_error(&self, code: &str, issue: &Issue) {
        self(code, issue)
    }
}

impl<F> WarningSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_warning(&self, code: &str, message: &str) {
        self(code, message)
    }
}
