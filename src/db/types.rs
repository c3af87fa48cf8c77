use serde::{Deserialize, Serialize};
use sqlx::Type;

pub(crate) const ADMIN_ROLE: &str = "admin";
pub(crate) const USER_ROLE: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "jobstate", rename_all = "lowercase")]
pub(crate) enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "jobkind", rename_all = "snake_case")]
pub(crate) enum JobKind {
    DailyReminders,
    MonthlyReports,
    ExportUserCsv,
    ExportAdminCsv,
    Cleanup,
}

impl JobKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::DailyReminders => "daily_reminders",
            Self::MonthlyReports => "monthly_reports",
            Self::ExportUserCsv => "export_user_csv",
            Self::ExportAdminCsv => "export_admin_csv",
            Self::Cleanup => "cleanup",
        }
    }
}
