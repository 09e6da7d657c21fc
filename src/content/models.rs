/// Content documents shown on the public site and managed from the admin panel
use crate::{content::Document, validation::is_valid_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

fn default_true() -> bool {
    true
}

fn default_icon() -> String {
    "FileText".to_string()
}

fn default_faq_category() -> String {
    "Общие".to_string()
}

fn email_shape(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Invalid email format".into()))
    }
}

/// Taxpayer number: 10 digits for organizations, 12 for individuals
fn inn_shape(inn: &str) -> Result<(), ValidationError> {
    if matches!(inn.len(), 10 | 12) && inn.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("inn").with_message("INN must contain 10 or 12 digits".into()))
    }
}

fn details_length(details: &[String]) -> Result<(), ValidationError> {
    if details.iter().all(|d| d.chars().count() <= 500) {
        Ok(())
    } else {
        Err(ValidationError::new("details")
            .with_message("Each detail must be at most 500 characters".into()))
    }
}

fn normalize_email(email: &mut String) {
    *email = email.trim().to_lowercase();
}

/// Offered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Stable slug used by the site and the update/delete routes
    #[validate(length(min = 1, max = 100, message = "Service id is required"))]
    pub service_id: String,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    #[validate(custom(function = "details_length"))]
    pub details: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
}

impl Document for Service {
    const COLLECTION: &'static str = "services";
    const LABEL: &'static str = "Service";

    fn normalize(&mut self) {
        self.service_id = self.service_id.trim().to_string();
        self.title = self.title.trim().to_string();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub telegram: Option<String>,
    pub vk: Option<String>,
    pub linkedin: Option<String>,
}

/// Team member card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "Role must be 1-200 characters"))]
    pub role: String,
    #[validate(length(min = 1, message = "Image URL is required"))]
    pub image_url: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "email_shape"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
}

impl Document for TeamMember {
    const COLLECTION: &'static str = "team";
    const LABEL: &'static str = "Team member";

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        if let Some(email) = self.email.as_mut() {
            normalize_email(email);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsCategory {
    #[default]
    News,
    Analytics,
    Event,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::News => "News",
            NewsCategory::Analytics => "Analytics",
            NewsCategory::Event => "Event",
        }
    }
}

/// News article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[validate(length(min = 1, max = 300, message = "Title must be 1-300 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "Summary must be 1-500 characters"))]
    pub summary: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Content must be at most 5000 characters"))]
    pub content: Option<String>,
    #[serde(default)]
    pub category: NewsCategory,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    /// Id of the admin who published the article
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub views: u64,
}

impl Document for NewsItem {
    const COLLECTION: &'static str = "news";
    const LABEL: &'static str = "News item";
    const SERVER_FIELDS: &'static [&'static str] = &["author", "views"];

    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
    }
}

/// Frequently asked question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    #[validate(length(min = 1, max = 500, message = "Question must be 1-500 characters"))]
    pub question: String,
    #[validate(length(min = 1, max = 2000, message = "Answer must be 1-2000 characters"))]
    pub answer: String,
    #[serde(default = "default_faq_category")]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub views: u64,
}

impl Document for Faq {
    const COLLECTION: &'static str = "faq";
    const LABEL: &'static str = "FAQ";

    fn normalize(&mut self) {
        self.question = self.question.trim().to_string();
        self.category = self.category.trim().to_string();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Pending,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Pending => "pending",
        }
    }
}

/// Customer record, visible to admins only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(custom(function = "email_shape"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Company must be at most 200 characters"))]
    pub company: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "inn_shape"))]
    pub inn: Option<String>,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub contract_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
    /// Id of the admin responsible for the client
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl Document for Client {
    const COLLECTION: &'static str = "clients";
    const LABEL: &'static str = "Client";

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        normalize_email(&mut self.email);
        if let Some(inn) = self.inn.as_mut() {
            *inn = inn.trim().to_string();
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InquiryStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::InProgress => "in-progress",
            InquiryStatus::Resolved => "resolved",
            InquiryStatus::Closed => "closed",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, InquiryStatus::Resolved | InquiryStatus::Closed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquirySource {
    #[default]
    Website,
    Email,
    Phone,
    Other,
}

/// Message submitted through the contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "email_shape"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 300, message = "Subject must be 1-300 characters"))]
    pub subject: String,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    #[serde(default)]
    pub status: InquiryStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub source: InquirySource,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Inquiry {
    /// Drop everything a public submitter may not choose
    pub fn reset_workflow(&mut self) {
        self.status = InquiryStatus::Pending;
        self.assigned_to = None;
        self.notes = None;
        self.resolved_at = None;
    }
}

impl Document for Inquiry {
    const COLLECTION: &'static str = "inquiries";
    const LABEL: &'static str = "Inquiry";
    const SERVER_FIELDS: &'static [&'static str] = &["resolvedAt"];

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.subject = self.subject.trim().to_string();
        if let Some(email) = self.email.as_mut() {
            normalize_email(email);
        }
    }
}
