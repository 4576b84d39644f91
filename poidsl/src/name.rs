//! Directives encoded in an animation's name.
//!
//! A name is a whitespace separated list of tokens. Tokens that are not
//! directives are plain label text and only matter for chain lookup.

use crate::{
    parser::{ParseError, Result},
    ACTIVITY_TOKEN, MINUTES_PER_DAY, OPEN_URL_TOKEN, RANDOM_DELAY_TOKEN, REMOTED_TOKEN,
    SET_ACTIVE_TOKEN, SET_INACTIVE_TOKEN, TIME_WINDOW_TOKEN,
};
use chrono::{NaiveTime, Timelike};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, u32},
    combinator::{cut, eof, map, opt, rest, verify},
    sequence::{preceded, terminated},
    Err::Error,
};
use tracing::warn;
use url::Url;

/// A side effect fired by name, either from a name token or a chain entry
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    OpenUrl(Url),
    SetActive { name: String, active: bool },
}

impl Action {
    /// Parses a single directive, `None` when the text is not one
    pub fn parse(s: &str) -> Option<Action> {
        match action(s.trim()) {
            Ok((_, a)) => Some(a),
            Err(nom::Err::Failure(ParseError::Url)) => {
                warn!(directive = s, "Ignoring open-url directive with an invalid URL");
                None
            }
            Err(_) => None,
        }
    }
}

/// Daily activation window in minutes since midnight, end exclusive
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl TimeWindow {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        let m = minute_of_day % MINUTES_PER_DAY;
        if self.start_minute == self.end_minute {
            false
        } else if self.start_minute < self.end_minute {
            m >= self.start_minute && m < self.end_minute
        } else {
            // Wraps past midnight
            m >= self.start_minute || m < self.end_minute
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum WindowSpec {
    #[default]
    Absent,
    Window(TimeWindow),
    /// A `Time:` token was present but didn't parse
    Malformed,
}

impl WindowSpec {
    /// Absent and malformed windows are never active
    pub fn should_be_active(&self, minute_of_day: u32) -> bool {
        match self {
            WindowSpec::Window(w) => w.contains(minute_of_day),
            WindowSpec::Absent | WindowSpec::Malformed => false,
        }
    }
}

/// Everything an animation name encodes, parsed once at load time
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NameDirectives {
    /// Activation is forwarded to a remote peer first
    pub remoted: bool,
    /// The delay is re-rolled in `[0, delay]` on every activation
    pub random_delay: bool,
    pub activity: Option<String>,
    pub window: WindowSpec,
    /// Fired on the just-activated edge
    pub actions: Vec<Action>,
}

impl NameDirectives {
    pub fn parse(name: &str) -> Self {
        let mut d = NameDirectives::default();
        for t in name.split_whitespace() {
            match token(t) {
                Ok((_, NameToken::Window(w))) => d.window = WindowSpec::Window(w),
                Ok((_, NameToken::Remoted)) => d.remoted = true,
                Ok((_, NameToken::RandomDelay)) => d.random_delay = true,
                Ok((_, NameToken::Activity(label))) => d.activity = Some(label.to_string()),
                Ok((_, NameToken::Action(a))) => d.actions.push(a),
                Ok((_, NameToken::Label)) => (),
                Err(_) if t.starts_with(TIME_WINDOW_TOKEN) => {
                    warn!(animation = name, token = t, "Malformed time window, treating as inactive");
                    d.window = WindowSpec::Malformed;
                }
                Err(_) => {
                    warn!(animation = name, token = t, "Ignoring malformed name directive");
                }
            }
        }
        d
    }

    /// Internal names don't take part in chain lookup
    pub fn is_internal(&self) -> bool {
        self.random_delay
    }
}

#[derive(Clone, Debug, PartialEq)]
enum NameToken<'a> {
    Window(TimeWindow),
    Remoted,
    RandomDelay,
    Activity(&'a str),
    Action(Action),
    Label,
}

fn token(s: &str) -> Result<&str, NameToken> {
    alt((
        map(parse_time_window, NameToken::Window),
        map(terminated(tag(REMOTED_TOKEN), eof), |_| NameToken::Remoted),
        map(terminated(tag(RANDOM_DELAY_TOKEN), eof), |_| {
            NameToken::RandomDelay
        }),
        map(preceded(tag(ACTIVITY_TOKEN), non_empty_rest), NameToken::Activity),
        map(action, NameToken::Action),
        map(rest, |_| NameToken::Label),
    ))(s)
}

/// `Time:HH:MM-HH:MM` or `Time:HH-HH`
pub fn parse_time_window(s: &str) -> Result<&str, TimeWindow> {
    preceded(tag(TIME_WINDOW_TOKEN), cut(window_body))(s)
}

fn window_body(s: &str) -> Result<&str, TimeWindow> {
    let (s, start_minute) = time_of_day(s)?;
    let (s, _) = char('-')(s)?;
    let (s, end_minute) = time_of_day(s)?;
    let (s, _) = eof(s)?;
    Ok((
        s,
        TimeWindow {
            start_minute,
            end_minute,
        },
    ))
}

fn time_of_day(s: &str) -> Result<&str, u32> {
    let (s, hour) = u32(s)?;
    let (s, minute) = opt(preceded(char(':'), u32))(s)?;
    let minute = minute.unwrap_or(0);
    if hour == 24 && minute == 0 {
        return Ok((s, MINUTES_PER_DAY));
    }
    let t = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(Error(ParseError::TimeOfDay))?;
    Ok((s, t.num_seconds_from_midnight() / 60))
}

fn action(s: &str) -> Result<&str, Action> {
    alt((open_url, set_active))(s)
}

fn open_url(s: &str) -> Result<&str, Action> {
    let (s, raw) = preceded(tag(OPEN_URL_TOKEN), non_empty_rest)(s)?;
    let url = Url::parse(raw).map_err(|_| nom::Err::Failure(ParseError::Url))?;
    Ok((s, Action::OpenUrl(url)))
}

fn set_active(s: &str) -> Result<&str, Action> {
    alt((
        map(preceded(tag(SET_INACTIVE_TOKEN), non_empty_rest), |n| {
            Action::SetActive {
                name: n.to_string(),
                active: false,
            }
        }),
        map(preceded(tag(SET_ACTIVE_TOKEN), non_empty_rest), |n| {
            Action::SetActive {
                name: n.to_string(),
                active: true,
            }
        }),
    ))(s)
}

fn non_empty_rest(s: &str) -> Result<&str, &str> {
    verify(rest, |r: &str| !r.is_empty())(s)
}
