/// Wire schemas for request bodies and query strings
///
/// These are validated at the edge and converted into domain inputs. They are
/// separate from storage records and domain types.
use crate::{
    account::AccountUpdate,
    auth::Registration,
    error::{AppError, AppResult},
    pagination::{Pagination, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT},
    tasks::{NewTask, Priority, SortBy, SortOrder, TaskChanges, TaskFilter, TaskStatus},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

const PASSWORD_SPECIALS: &str = "!@#$%^&*";

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if has_letter && has_digit && has_special {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(
            "Password must contain at least one letter, one number, and one special character",
        )))
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
}

fn validate_due_date(raw: &str) -> Result<(), ValidationError> {
    match parse_due_date(raw) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("due_date")
            .with_message(Cow::Borrowed("Invalid date, expected YYYY-MM-DD or RFC 3339"))),
    }
}

fn due_date(raw: &str) -> AppResult<DateTime<Utc>> {
    parse_due_date(raw).ok_or_else(|| AppError::BadRequest("Invalid dueDate".to_string()))
}

// Accounts

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 50))]
    pub firstname: String,
    #[validate(length(min = 1, max = 50))]
    pub lastname: String,
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 50), custom(function = "validate_password"))]
    pub password: String,
    pub profile_img: Option<String>,
}

impl From<RegisterUserRequest> for Registration {
    fn from(req: RegisterUserRequest) -> Self {
        Registration {
            email: req.email,
            password: req.password,
            firstname: req.firstname,
            lastname: req.lastname,
            username: Some(req.username),
            profile_img: req.profile_img,
        }
    }
}

/// Admin registration; the username is derived from the email when omitted
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdminRequest {
    #[validate(length(min = 1, max = 50))]
    pub firstname: String,
    #[validate(length(min = 1, max = 50))]
    pub lastname: String,
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 50), custom(function = "validate_password"))]
    pub password: String,
    pub profile_img: Option<String>,
}

impl From<RegisterAdminRequest> for Registration {
    fn from(req: RegisterAdminRequest) -> Self {
        Registration {
            email: req.email,
            password: req.password,
            firstname: req.firstname,
            lastname: req.lastname,
            username: req.username,
            profile_img: req.profile_img,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 50))]
    pub firstname: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub lastname: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub profile_img: Option<String>,
}

impl From<UpdateAccountRequest> for AccountUpdate {
    fn from(req: UpdateAccountRequest) -> Self {
        AccountUpdate {
            firstname: req.firstname,
            lastname: req.lastname,
            username: req.username,
            email: req.email,
            profile_img: req.profile_img,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    /// Checked against the stored hash only; older passwords may predate the rules
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 50), custom(function = "validate_password"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

// Tasks

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    #[validate(length(min = 2, message = "title is required and can not be a single letter"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub objective: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[validate(custom(function = "validate_due_date"))]
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
    #[validate(url(message = "imgUrl must be a URL"))]
    pub img_url: Option<String>,
}

impl TaskCreateRequest {
    pub fn into_new_task(self) -> AppResult<NewTask> {
        Ok(NewTask {
            due_date: due_date(&self.due_date)?,
            title: self.title,
            description: self.description,
            completed: self.completed,
            objective: self.objective,
            notes: self.notes,
            status: self.status,
            priority: self.priority,
            img_url: self.img_url,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    #[validate(length(min = 2, message = "title can not be a single letter"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
    #[validate(custom(function = "validate_due_date"))]
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    #[validate(url(message = "imgUrl must be a URL"))]
    pub img_url: Option<String>,
}

impl TaskUpdateRequest {
    pub fn into_changes(self) -> AppResult<TaskChanges> {
        Ok(TaskChanges {
            due_date: self.due_date.as_deref().map(due_date).transpose()?,
            title: self.title,
            description: self.description,
            completed: self.completed,
            objective: self.objective,
            notes: self.notes,
            status: self.status,
            priority: self.priority,
            img_url: self.img_url,
        })
    }
}

/// `GET /tasks` query string
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub completed: Option<bool>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[validate(custom(function = "validate_due_date"))]
    pub due_date: Option<String>,
}

impl TaskListQuery {
    pub fn into_filter(self, user_id: &str) -> AppResult<TaskFilter> {
        let due_date = self
            .due_date
            .as_deref()
            .map(due_date)
            .transpose()?
            .map(|dt| dt.date_naive());

        Ok(TaskFilter {
            user_id: user_id.to_string(),
            search: self.search.filter(|s| !s.trim().is_empty()),
            status: self.status,
            completed: self.completed,
            priority: self.priority,
            due_date,
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
            pagination: Pagination::new(
                self.page.unwrap_or(DEFAULT_PAGE),
                self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
            username: "jane".to_string(),
            email: "jane@example.com".to_string(),
            password: password.to_string(),
            profile_img: None,
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(register("Secr3t!pass").validate().is_ok());
        // Missing special character
        assert!(register("Secr3tpass").validate().is_err());
        // Missing digit
        assert!(register("Secret!pass").validate().is_err());
        // Too short
        assert!(register("S3c!").validate().is_err());
        // Too long
        assert!(register(&format!("S3c!{}", "a".repeat(50))).validate().is_err());
    }

    #[test]
    fn test_register_field_errors() {
        let mut req = register("Secr3t!pass");
        req.email = "not-an-email".to_string();
        req.firstname = String::new();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("firstname"));
    }

    #[test]
    fn test_password_update_rules_apply_to_new_password_only() {
        let req = PasswordUpdateRequest {
            old_password: "legacy".to_string(),
            new_password: "N3w!password".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = PasswordUpdateRequest {
            old_password: String::new(),
            new_password: "N3w!password".to_string(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("old_password"));

        let req = PasswordUpdateRequest {
            old_password: "legacy".to_string(),
            new_password: "weakpassword".to_string(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("new_password"));
    }

    #[test]
    fn test_due_date_formats() {
        let day = parse_due_date("2024-05-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-05-01T00:00:00+00:00");

        let dt = parse_due_date("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-05-01T08:30:00+00:00");

        assert!(parse_due_date("01/05/2024").is_none());
    }

    #[test]
    fn test_task_create_defaults() {
        let req: TaskCreateRequest =
            serde_json::from_str(r#"{"title":"Pay rent","dueDate":"2024-05-01"}"#).unwrap();
        assert!(req.validate().is_ok());

        let task = req.into_new_task().unwrap();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, Priority::Low);
        assert!(!task.completed);
    }

    #[test]
    fn test_task_create_rejects_short_title_and_bad_url() {
        let req: TaskCreateRequest = serde_json::from_str(
            r#"{"title":"x","dueDate":"2024-05-01","imgUrl":"not a url"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("img_url"));
    }

    #[test]
    fn test_task_list_query_defaults() {
        let filter = TaskListQuery::default().into_filter("alice").unwrap();
        assert_eq!(filter.pagination, Pagination::new(1, 10));
        assert_eq!(filter.sort_by, SortBy::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Asc);

        let query = TaskListQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_task_list_query_due_date_is_a_day() {
        let query = TaskListQuery {
            due_date: Some("2024-05-01T23:00:00Z".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter("alice").unwrap();
        assert_eq!(filter.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }
}
