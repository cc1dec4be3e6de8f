//! Value types handed to scripts.
//!
//! [`Vector`], [`Transform`] and [`Image`] cross the boundary by value: a
//! script receives a copy, and writing a field of that copy does not touch
//! the tile it came from. Tiles and labels are handles instead, see
//! [`super::entities`].

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use mlua::prelude::*;

use crate::components::tile::Image;
use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::error::{EngineError, EngineResult};

fn scalar(value: &LuaValue) -> Option<f32> {
    match value {
        LuaValue::Integer(i) => Some(*i as f32),
        LuaValue::Number(n) => Some(*n as f32),
        _ => None,
    }
}

fn expected(what: &str, value: &LuaValue) -> LuaError {
    LuaError::runtime(format!("expected {what}, got {}", value.type_name()))
}

impl FromLua for Vector {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match &value {
            LuaValue::UserData(ud) => Ok(*ud.borrow::<Self>()?),
            _ => Err(expected("vector", &value)),
        }
    }
}

impl FromLua for Transform {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match &value {
            LuaValue::UserData(ud) => Ok(*ud.borrow::<Self>()?),
            _ => Err(expected("transform", &value)),
        }
    }
}

impl FromLua for Image {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match &value {
            LuaValue::UserData(ud) => Ok(ud.borrow::<Self>()?.clone()),
            _ => Err(expected("image", &value)),
        }
    }
}

impl LuaUserData for Vector {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.x));
        fields.add_field_method_set("x", |_, this, x: f32| {
            this.x = x;
            Ok(())
        });
        fields.add_field_method_get("y", |_, this| Ok(this.y));
        fields.add_field_method_set("y", |_, this, y: f32| {
            this.y = y;
            Ok(())
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("length", |_, this, ()| Ok(this.length()));
        methods.add_method("angle", |_, this, ()| Ok(this.angle()));
        methods.add_method("unit", |_, this, ()| Ok(this.unit()));

        // In-place mutators
        methods.add_method_mut("rotate", |_, this, degrees: f32| {
            this.rotate(degrees);
            Ok(())
        });
        methods.add_method_mut("adjust", |_, this, length: f32| {
            this.adjust(length);
            Ok(())
        });
        methods.add_method_mut("interpolate", |_, this, (other, time): (Vector, f32)| {
            this.interpolate(other, time);
            Ok(())
        });
        methods.add_method_mut("clamp", |_, this, (min, max): (Vector, Vector)| {
            Ok(this.clamp(min, max)?)
        });
        methods.add_method_mut("normalize", |_, this, limit: Vector| {
            Ok(this.normalize(limit)?)
        });

        methods.add_meta_function(LuaMetaMethod::Add, |_, (a, b): (Vector, Vector)| Ok(a + b));
        methods.add_meta_function(LuaMetaMethod::Sub, |_, (a, b): (Vector, Vector)| Ok(a - b));
        methods.add_meta_function(LuaMetaMethod::Mul, |lua, (a, b): (LuaValue, LuaValue)| {
            match (scalar(&a), scalar(&b)) {
                (Some(s), _) => Ok(Vector::from_lua(b, lua)? * s),
                (_, Some(s)) => Ok(Vector::from_lua(a, lua)? * s),
                _ => Ok(Vector::from_lua(a, lua)? * Vector::from_lua(b, lua)?),
            }
        });
        methods.add_meta_method(LuaMetaMethod::Unm, |_, this, ()| Ok(-*this));
        methods.add_meta_function(LuaMetaMethod::Eq, |_, (a, b): (Vector, Vector)| Ok(a == b));
        methods.add_meta_function(LuaMetaMethod::Lt, |_, (a, b): (Vector, Vector)| {
            Ok(a.length() < b.length())
        });
        methods.add_meta_function(LuaMetaMethod::Le, |_, (a, b): (Vector, Vector)| {
            Ok(a.length() <= b.length())
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}

impl LuaUserData for Transform {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("position", |_, this| Ok(this.position));
        fields.add_field_method_set("position", |_, this, position: Vector| {
            this.position = position;
            Ok(())
        });
        fields.add_field_method_get("scale", |_, this| Ok(this.scale));
        fields.add_field_method_set("scale", |_, this, scale: Vector| {
            this.scale = scale;
            Ok(())
        });
        fields.add_field_method_get("rotation", |_, this| Ok(this.rotation));
        fields.add_field_method_set("rotation", |_, this, rotation: f32| {
            this.rotation = rotation;
            Ok(())
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("diagonal", |_, this, ()| Ok(this.diagonal()));
        methods.add_method("center", |_, this, ()| Ok(this.center()));
        methods.add_method("distance", |_, this, other: Transform| {
            Ok(Transform::distance(this, &other))
        });
        methods.add_method("angle", |_, this, other: Transform| {
            Ok(Transform::angle(this, &other))
        });
        methods.add_method("intersects", |_, this, other: Transform| {
            Ok(Transform::intersect(this, &other))
        });

        methods.add_method_mut("rotate", |_, this, degrees: f32| {
            this.rotate(degrees);
            Ok(())
        });
        methods.add_method_mut("adjust", |_, this, diagonal: f32| {
            this.adjust(diagonal);
            Ok(())
        });
        methods.add_method_mut("interpolate", |_, this, (other, time): (Transform, f32)| {
            this.interpolate(&other, time);
            Ok(())
        });
        methods.add_method_mut("clamp", |_, this, (min, max): (Vector, Vector)| {
            Ok(this.clamp(min, max)?)
        });

        methods.add_meta_function(LuaMetaMethod::Eq, |_, (a, b): (Transform, Transform)| {
            Ok(a == b)
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}

impl LuaUserData for Image {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("path", |_, this| Ok(this.path.to_string()));
        fields.add_field_method_get("width", |_, this| Ok(this.width));
        fields.add_field_method_get("height", |_, this| Ok(this.height));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("diagonal", |_, this, ()| Ok(this.diagonal()));
        methods.add_meta_function(LuaMetaMethod::Eq, |_, (a, b): (Image, Image)| Ok(a == b));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("{} ({}x{})", this.path, this.width, this.height))
        });
    }
}

/// Wall-clock stopwatch for scripts.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    /// Seconds since creation or the last reset.
    pub fn elapsed(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl LuaUserData for Stopwatch {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("reset", |_, this, ()| {
            this.reset();
            Ok(())
        });
        methods.add_method("elapsed", |_, this, ()| Ok(this.elapsed()));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("{:.3}s", this.elapsed()))
        });
    }
}

/// Countdown built on a [`Stopwatch`].
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    stopwatch: Stopwatch,
    pub delay: f32,
}

impl Timer {
    pub fn new(delay: f32) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            delay,
        }
    }

    pub fn reset(&mut self) {
        self.stopwatch.reset();
    }

    /// Seconds remaining, never negative.
    pub fn left(&self) -> f32 {
        (self.delay - self.stopwatch.elapsed()).max(0.0)
    }

    pub fn done(&self) -> bool {
        self.left() == 0.0
    }
}

impl LuaUserData for Timer {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("delay", |_, this| Ok(this.delay));
        fields.add_field_method_set("delay", |_, this, delay: f32| {
            this.delay = delay;
            Ok(())
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("reset", |_, this, ()| {
            this.reset();
            Ok(())
        });
        methods.add_method("left", |_, this, ()| Ok(this.left()));
        methods.add_method("done", |_, this, ()| Ok(this.done()));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("{:.3}s left", this.left()))
        });
    }
}

/// Calendar date with second resolution.
///
/// Dates order by [`total`](Date::total), which counts every month as 30
/// days. Two dates that differ only across a month boundary can therefore
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Date {
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> EngineResult<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(EngineError::validation(format!(
                "invalid date {year:04}-{month:02}-{day:02}"
            )));
        }
        if hour > 23 || minute > 59 || second > 60 {
            return Err(EngineError::validation(format!(
                "invalid time {hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            // Leap seconds report as 60.
            second: (dt.second() + dt.nanosecond() / 1_000_000_000) as u8,
        }
    }

    /// Seconds since year zero on a 360 day calendar.
    pub fn total(&self) -> u64 {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        const DAY: u64 = 24 * HOUR;
        const MONTH: u64 = 30 * DAY;
        const YEAR: u64 = 12 * MONTH;
        self.year as u64 * YEAR
            + self.month as u64 * MONTH
            + self.day as u64 * DAY
            + self.hour as u64 * HOUR
            + self.minute as u64 * MINUTE
            + self.second as u64
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:02}-{:02}-{:04} {:02}-{:02}-{:02})",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        )
    }
}

impl FromLua for Date {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match &value {
            LuaValue::UserData(ud) => Ok(*ud.borrow::<Self>()?),
            _ => Err(expected("date", &value)),
        }
    }
}

impl LuaUserData for Date {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("year", |_, this| Ok(this.year));
        fields.add_field_method_get("month", |_, this| Ok(this.month));
        fields.add_field_method_get("day", |_, this| Ok(this.day));
        fields.add_field_method_get("hour", |_, this| Ok(this.hour));
        fields.add_field_method_get("minute", |_, this| Ok(this.minute));
        fields.add_field_method_get("second", |_, this| Ok(this.second));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("total", |_, this, ()| Ok(this.total()));
        methods.add_meta_function(LuaMetaMethod::Eq, |_, (a, b): (Date, Date)| {
            Ok(a.total() == b.total())
        });
        methods.add_meta_function(LuaMetaMethod::Lt, |_, (a, b): (Date, Date)| {
            Ok(a.total() < b.total())
        });
        methods.add_meta_function(LuaMetaMethod::Le, |_, (a, b): (Date, Date)| {
            Ok(a.total() <= b.total())
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}
