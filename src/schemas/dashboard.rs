use serde::{Deserialize, Serialize};

use crate::repositories::dashboard::{AdminTotals, QuizPopularity, SubjectQuizCount};
use crate::schemas::score::ScoreResponse;
use crate::services::reporting::{DistributionBucket, MonthlyActivity};

/// Cached as a whole, so every part round-trips through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dashboard_type", rename_all = "lowercase")]
pub(crate) enum DashboardResponse {
    Admin(AdminDashboard),
    User(UserDashboard),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AdminDashboard {
    pub(crate) statistics: AdminTotals,
    pub(crate) charts: AdminCharts,
    pub(crate) recent_scores: Vec<ScoreResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AdminCharts {
    pub(crate) top_quizzes: Vec<QuizPopularity>,
    pub(crate) monthly_activity: Vec<MonthlyActivity>,
    pub(crate) score_distribution: Vec<DistributionBucket>,
    pub(crate) quiz_status: Vec<LabelledCount>,
    pub(crate) user_types: Vec<LabelledCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LabelledCount {
    pub(crate) label: String,
    pub(crate) count: i64,
}

impl LabelledCount {
    pub(crate) fn new(label: &str, count: i64) -> Self {
        Self { label: label.to_string(), count }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserDashboard {
    pub(crate) statistics: UserStatistics,
    pub(crate) charts: UserCharts,
    pub(crate) user_info: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserStatistics {
    pub(crate) total_attempts: i64,
    pub(crate) total_quizzes_available: i64,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: f64,
    pub(crate) best_score: Option<ScoreResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserCharts {
    pub(crate) recent_performance: Vec<RecentPerformance>,
    pub(crate) available_quizzes: Vec<SubjectQuizCount>,
    pub(crate) monthly_activity: Vec<MonthlyActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecentPerformance {
    pub(crate) quiz_title: String,
    pub(crate) score: i32,
    pub(crate) total: i64,
    pub(crate) percentage: f64,
    pub(crate) date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserInfo {
    pub(crate) full_name: String,
    pub(crate) qualification: Option<String>,
    pub(crate) member_since: String,
}
