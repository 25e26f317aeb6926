//! Money Forward attendance client: session establishment and form replay.
//!
//! The service has no JSON API. Every mutation is an HTML form submission
//! guarded by an anti-forgery token embedded in a rendered page, so each
//! operation is a fetch-then-submit round trip:
//!
//! 1. `GET` a page with the session cookie
//! 2. scrape the token (and any identifiers) out of the markup
//! 3. `POST` the form with the token replayed
//!
//! Login follows the same shape with one extra wrinkle: the server rotates
//! the `_session_id` cookie after credential verification, and the rotated
//! cookie from the *final* (post-redirect) response is the one a session
//! must carry.
//!
//! HTTP-level failures are values: `record` and `post_entries` return the
//! failing status code and the caller classifies it with [`status_ok`].
//! Structural
//! failures (an expected element missing from a page) are typed errors.

use crate::libs::entry::{event_pair, TimeEntry};
use crate::libs::scrape::{self, ScrapeError, TOKEN_FIELD};
use crate::msg_debug;
use chrono::{NaiveDateTime, Utc};
use dialoguer::{theme::ColorfulTheme, Input};
use reqwest::{
    header::{self, HeaderMap},
    redirect, Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Production endpoint of the attendance service.
pub const DEFAULT_BASE_URL: &str = "https://attendance.moneyforward.com";

const SESSION_COOKIE_KEY: &str = "_session_id=";
const LOGIN_PAGE_URL: &str = "employee_session/new";
const LOGIN_URL: &str = "employee_session";
const MY_PAGE_URL: &str = "my_page";
const RECORDER_URL: &str = "my_page/web_time_recorder";
const ATTENDANCES_URL: &str = "my_page/attendances";

/// `<meta>` tag on the landing page carrying the employee identifier.
const EMPLOYEE_META: &str = "js:rollbar:uid";
/// Hidden input on the landing page carrying the office location identifier.
const LOCATION_INPUT_ID: &str = "web_time_recorder_form_office_location_id";
/// Submit label of the attendance edit form ("save").
const COMMIT_LABEL: &str = "保存";

/// The four atomic attendance actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ClockIn,
    ClockOut,
    StartBreak,
    EndBreak,
}

impl EventType {
    /// Wire value used in form fields and button markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ClockIn => "clock_in",
            EventType::ClockOut => "clock_out",
            EventType::StartBreak => "start_break",
            EventType::EndBreak => "end_break",
        }
    }

    /// Progress label shown while the event is being recorded.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::ClockIn => "Starting job",
            EventType::ClockOut => "Finishing job",
            EventType::StartBreak => "Starting break",
            EventType::EndBreak => "Finishing break",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("attendance service returned HTTP {0}")]
    Http(StatusCode),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error("response did not set a _session_id cookie")]
    MissingSessionCookie,
    #[error("login response has no redirect target")]
    MissingRedirect,
    #[error("no time entries to post")]
    NoEntries,
    #[error("time entries span more than one calendar date")]
    MixedDates,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// An authenticated session against the attendance service.
///
/// Created once per login and immutable afterwards. Not safe for concurrent
/// use; callers serialize operations against one handle. Dropping the handle
/// releases it — the service has no logout endpoint worth calling, so no
/// remote cleanup is performed.
#[derive(Debug)]
pub struct AttendanceSession {
    session_id: String,
    employee_id: String,
    location_id: String,
}

impl AttendanceSession {
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }
}

/// Client for the attendance service protocol.
pub struct Attendance {
    client: Client,
    base_url: String,
}

impl Attendance {
    /// Creates a client for the configured endpoint.
    ///
    /// Redirects are disabled on the underlying client: the login sequence
    /// must observe the redirect response to capture the rotated session
    /// cookie before following it.
    pub fn new(config: &AttendanceConfig) -> Result<Self, AttendanceError> {
        let client = Client::builder().redirect(redirect::Policy::none()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Performs the login sequence and returns a session handle.
    ///
    /// Login page → CSRF token → credential POST (redirects disabled) →
    /// landing page fetched with the rotated cookie. The returned handle
    /// carries the cookie set by the final response, the employee id from
    /// the landing page's metadata tag, and the office location id from its
    /// hidden recorder form field.
    pub async fn login(
        &self,
        office_account_name: &str,
        account_name_or_email: &str,
        password: &str,
    ) -> Result<AttendanceSession, AttendanceError> {
        // 1. Login form page
        let new = self.client.get(format!("{}/{}", self.base_url, LOGIN_PAGE_URL)).send().await?;
        if !status_ok(new.status()) {
            return Err(AttendanceError::Http(new.status()));
        }
        let pre_login_cookie = session_cookie(new.headers()).ok_or(AttendanceError::MissingSessionCookie)?;
        let token = scrape::input_by_name(&new.text().await?, TOKEN_FIELD)?;

        // 2. Credential POST with the pre-login cookie
        let form = [
            (TOKEN_FIELD, token.as_str()),
            ("employee_session_form[office_account_name]", office_account_name),
            ("employee_session_form[account_name_or_email]", account_name_or_email),
            ("employee_session_form[password]", password),
        ];
        let login = self
            .client
            .post(format!("{}/{}", self.base_url, LOGIN_URL))
            .header(header::COOKIE, cookie_header(&pre_login_cookie))
            .form(&form)
            .send()
            .await?;
        if !status_ok(login.status()) {
            return Err(AttendanceError::Http(login.status()));
        }

        // 3. The server rotates the session cookie after verification; the
        //    pre-login cookie is dead from here on.
        let rotated_cookie = session_cookie(login.headers()).ok_or(AttendanceError::MissingSessionCookie)?;
        let target = login
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AttendanceError::MissingRedirect)?;
        let target = self.resolve(target);
        msg_debug!("login redirect -> {}", target);

        // 4. Landing page with the rotated cookie
        let landing = self.client.get(target).header(header::COOKIE, cookie_header(&rotated_cookie)).send().await?;
        if !status_ok(landing.status()) {
            return Err(AttendanceError::Http(landing.status()));
        }
        let session_id = session_cookie(landing.headers()).ok_or(AttendanceError::MissingSessionCookie)?;
        let page = landing.text().await?;

        Ok(AttendanceSession {
            session_id,
            employee_id: scrape::meta_content(&page, EMPLOYEE_META)?,
            location_id: scrape::input_by_id(&page, LOCATION_INPUT_ID)?,
        })
    }

    /// Records a point-in-time attendance event at the current UTC time.
    ///
    /// The landing page embeds one small form per action button, each with
    /// its own anti-forgery token; the token scoped to `event`'s button is
    /// selected. A failed page fetch short-circuits with that status and no
    /// POST is attempted.
    pub async fn record(&self, session: &AttendanceSession, event: EventType) -> Result<StatusCode, AttendanceError> {
        let mypage = self
            .client
            .get(format!("{}/{}", self.base_url, MY_PAGE_URL))
            .header(header::COOKIE, cookie_header(&session.session_id))
            .send()
            .await?;
        if !status_ok(mypage.status()) {
            return Ok(mypage.status());
        }
        let token = scrape::event_token(&mypage.text().await?, event.as_str())?;

        let now = Utc::now();
        let form = [
            (TOKEN_FIELD, token),
            ("web_time_recorder_form[event]", event.as_str().to_string()),
            // The service wants an unpadded Y/M/D date next to a millisecond
            // ISO-8601 timestamp, both in UTC.
            ("web_time_recorder_form[date]", now.format("%Y/%-m/%-d").to_string()),
            ("web_time_recorder_form[user_time]", now.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()),
            ("web_time_recorder_form[office_location_id]", session.location_id.clone()),
        ];
        msg_debug!("recording {} at {}", event, now);

        let recorder = self
            .client
            .post(format!("{}/{}", self.base_url, RECORDER_URL))
            .header(header::COOKIE, cookie_header(&session.session_id))
            .form(&form)
            .send()
            .await?;
        Ok(recorder.status())
    }

    /// Posts a day's time entries retroactively through the edit form.
    ///
    /// Entries must be caller-ordered chronologically and share one calendar
    /// date; each entry contributes two indexed records whose event kinds
    /// follow the positional rules of [`event_pair`]. The form is submitted
    /// as a PUT via the `_method` override field, with the employee id as a
    /// query parameter.
    pub async fn post_entries(&self, session: &AttendanceSession, entries: &[TimeEntry]) -> Result<StatusCode, AttendanceError> {
        let first = entries.first().ok_or(AttendanceError::NoEntries)?;
        let date = first.start.date();
        if entries.iter().any(|entry| entry.start.date() != date || entry.stop.date() != date) {
            return Err(AttendanceError::MixedDates);
        }
        let date = date.format("%Y-%m-%d").to_string();

        let edit = self
            .client
            .get(format!("{}/{}/{}/edit", self.base_url, ATTENDANCES_URL, date))
            .header(header::COOKIE, cookie_header(&session.session_id))
            .send()
            .await?;
        if !status_ok(edit.status()) {
            return Ok(edit.status());
        }
        // One token for the whole edit form, unlike the per-button tokens
        // on the landing page.
        let token = scrape::input_by_name(&edit.text().await?, TOKEN_FIELD)?;

        let mut form: Vec<(String, String)> = vec![
            ("_method".into(), "put".into()),
            (TOKEN_FIELD.into(), token),
            ("attendance_schedule_form[start_time]".into(), String::new()),
            ("attendance_schedule_form[end_time]".into(), String::new()),
            ("attendance_schedule_form[attendance_form_attributes][note]".into(), String::new()),
            ("commit".into(), COMMIT_LABEL.into()),
        ];
        for (i, entry) in entries.iter().enumerate() {
            let (ev_start, ev_stop) = event_pair(i, entries.len());
            push_record(&mut form, i * 2, ev_start, entry.start, &session.location_id);
            push_record(&mut form, i * 2 + 1, ev_stop, entry.stop, &session.location_id);
        }
        msg_debug!("posting {} entries for {}", entries.len(), date);

        let posted = self
            .client
            .post(format!("{}/{}/{}", self.base_url, ATTENDANCES_URL, date))
            .query(&[("employee_id", session.employee_id.as_str())])
            .header(header::COOKIE, cookie_header(&session.session_id))
            .form(&form)
            .send()
            .await?;
        Ok(posted.status())
    }

    /// Resolves a redirect target against the base URL.
    fn resolve(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            format!("{}/{}", self.base_url, location)
        }
    }
}

/// Appends one indexed attendance record to the edit form.
fn push_record(form: &mut Vec<(String, String)>, index: usize, event: EventType, at: NaiveDateTime, location_id: &str) {
    let key = |field: &str| format!("attendance_schedule_form[attendance_record_forms_attributes][{}][{}]", index, field);
    form.push((key("event"), event.as_str().into()));
    form.push((key("_destroy"), "false".into()));
    form.push((key("date"), at.format("%Y-%m-%d").to_string()));
    form.push((key("time"), at.format("%H:%M").to_string()));
    form.push((key("attendance_record_id"), String::new()));
    form.push((key("office_location_id"), location_id.into()));
}

/// Non-2xx/3xx responses count as failures; redirects are part of the
/// normal protocol flow.
///
/// This is the one success predicate: redirects are disabled on the
/// client, so a Rails-style 302 answer to a successful form POST must
/// classify as success just like a 200.
pub fn status_ok(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| raw.split(';').next().and_then(|pair| pair.trim().strip_prefix(SESSION_COOKIE_KEY)).map(str::to_string))
}

fn cookie_header(session_id: &str) -> String {
    format!("{}{}", SESSION_COOKIE_KEY, session_id)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AttendanceConfig {
    /// Company account name used on the login form.
    pub office_account_name: String,
    /// Account name or email used on the login form.
    pub account_name_or_email: String,
    /// Service endpoint; overridable for testing against a local fixture.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            office_account_name: String::new(),
            account_name_or_email: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl AttendanceConfig {
    pub fn init(config: &Option<AttendanceConfig>) -> anyhow::Result<Self> {
        let config = config.clone().unwrap_or_default();

        Ok(Self {
            office_account_name: Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter your company account name")
                .default(config.office_account_name)
                .interact_text()?,
            account_name_or_email: Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter your account name or email")
                .default(config.account_name_or_email)
                .interact_text()?,
            base_url: Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter the attendance service URL")
                .default(config.base_url)
                .interact_text()?,
        })
    }
}
