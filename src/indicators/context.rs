use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::fields::{resolve_fields, FieldMap};

/// Everything an extractor may need besides the session itself.
pub struct ExtractionContext {
    pub url: String,
    pub db: String,
    pub api_user: String,
    pub server_version: String,
    pub company_id: i64,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
    pub first_day_of_year: String,
    pub date_30_days_ago: String,
    pub fields: &'static FieldMap,
    pub modules: HashMap<String, bool>,
}

impl ExtractionContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: String,
        db: String,
        api_user: String,
        server_version: String,
        company_id: i64,
        modules: HashMap<String, bool>,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let first_day_of_year = NaiveDate::from_ymd_opt(today.year(), 1, 1)
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string();
        let date_30_days_ago = (today - Duration::days(30)).format("%Y-%m-%d").to_string();
        let fields = resolve_fields(&server_version);
        Self {
            url,
            db,
            api_user,
            server_version,
            company_id,
            today,
            now,
            first_day_of_year,
            date_30_days_ago,
            fields,
            modules,
        }
    }

    pub fn module_installed(&self, name: &str) -> bool {
        self.modules.get(name).copied().unwrap_or(false)
    }

    pub fn today_str(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }

    pub fn now_str(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
