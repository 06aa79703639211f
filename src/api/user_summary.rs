use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::client::Client;
use crate::error::Error;

pub struct UserSummaryService {
    client: Arc<Client>,
}

/// Dated stat entry, the shape most usersummary endpoints return.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat<T> {
    pub calendar_date: String,
    pub values: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStat {
    pub high_stress_duration: Option<i64>,
    pub low_stress_duration: Option<i64>,
    pub medium_stress_duration: Option<i64>,
    pub rest_stress_duration: Option<i64>,
    pub overall_stress_level: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateStat {
    #[serde(rename = "wellnessMaxAvgHR")]
    pub wellness_max_avg_hr: Option<i64>,
    #[serde(rename = "wellnessMinAvgHR")]
    pub wellness_min_avg_hr: Option<i64>,
    #[serde(rename = "restingHR")]
    pub resting_hr: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStepsStat {
    pub step_goal: Option<i64>,
    pub total_steps: Option<i64>,
    pub total_distance: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsAggregations {
    pub total_steps_average: Option<f64>,
    pub total_steps_weekly_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySteps {
    pub values: Vec<Stat<DailyStepsStat>>,
    pub aggregations: StepsAggregations,
}

impl UserSummaryService {
    pub(crate) fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn daily_stress(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Stat<StressStat>>, Error> {
        let path = format!("/usersummary-service/stats/stress/daily/{start}/{end}");
        self.client.api_get(&path, &[]).await
    }

    pub async fn daily_heart_rate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Stat<HeartRateStat>>, Error> {
        let path = format!("/usersummary-service/stats/heartRate/daily/{start}/{end}");
        self.client.api_get(&path, &[]).await
    }

    pub async fn daily_steps(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySteps, Error> {
        let today = self.client.clock().now().date_naive().to_string();
        let path = format!("/usersummary-service/stats/daily/{start}/{end}");
        self.client
            .api_get(
                &path,
                &[("statsType", "STEPS"), ("currentDate", today.as_str())],
            )
            .await
    }
}
