//! Typed parameter names and values for status queries and commands.
//!
//! On the wire a unit's state is two parallel JSON arrays: a list of column
//! names (`"Pow"`, `"SetTem"`, …) and a list of values at the same indices.
//! [`ParameterMap`] is the typed form of that pair: it keeps insertion order
//! so a map converts back to the same column order it came from, while
//! lookups go by name.

use std::fmt;

use serde_json::Value;

use crate::protocol::error::ProtocolError;

/// A protocol-defined parameter name.
///
/// Known columns get their own variant.  Anything else a unit reports is kept
/// verbatim in [`ParameterName::Unknown`] so newer firmware still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterName {
    /// Power, 0 = off, 1 = on.
    Power,
    /// Operating mode: 0 auto, 1 cool, 2 dry, 3 fan, 4 heat.
    Mode,
    /// Target temperature in the unit's temperature scale.
    SetTemperature,
    /// Temperature unit: 0 Celsius, 1 Fahrenheit.
    TemperatureUnit,
    /// Fan speed: 0 auto, 1–5 low to high.
    FanSpeed,
    /// Fresh-air valve.
    FreshAir,
    /// X-Fan: keep the fan running after cooling to dry the coil.
    XFan,
    /// Ionizer ("cold plasma").
    Health,
    /// Sleep mode.
    Sleep,
    /// Indicator light on the unit.
    Light,
    /// Horizontal swing position.
    SwingHorizontal,
    /// Vertical swing position.
    SwingVertical,
    /// Quiet mode.
    Quiet,
    /// Turbo mode.
    Turbo,
    /// Maintain 8 °C heating.
    SteadyHeat,
    /// Energy-saving mode.
    EnergySaving,
    HeatCoolType,
    /// Fahrenheit rounding helper bit.
    TemperatureRecord,
    /// Room temperature sensor reading (read-only).
    TemperatureSensor,
    /// A column this crate has no name for.
    Unknown(String),
}

impl ParameterName {
    /// Every column requested by a full status query, in request order.
    pub const STATUS_COLUMNS: [ParameterName; 19] = [
        ParameterName::Power,
        ParameterName::Mode,
        ParameterName::SetTemperature,
        ParameterName::TemperatureUnit,
        ParameterName::FanSpeed,
        ParameterName::FreshAir,
        ParameterName::XFan,
        ParameterName::Health,
        ParameterName::Sleep,
        ParameterName::Light,
        ParameterName::SwingHorizontal,
        ParameterName::SwingVertical,
        ParameterName::Quiet,
        ParameterName::Turbo,
        ParameterName::SteadyHeat,
        ParameterName::EnergySaving,
        ParameterName::HeatCoolType,
        ParameterName::TemperatureRecord,
        ParameterName::TemperatureSensor,
    ];

    /// Parses a wire column name.  Never fails; unrecognised names become
    /// [`ParameterName::Unknown`].
    pub fn from_wire(name: &str) -> Self {
        match name {
            "Pow" => Self::Power,
            "Mod" => Self::Mode,
            "SetTem" => Self::SetTemperature,
            "TemUn" => Self::TemperatureUnit,
            "WdSpd" => Self::FanSpeed,
            "Air" => Self::FreshAir,
            "Blo" => Self::XFan,
            "Health" => Self::Health,
            "SwhSlp" => Self::Sleep,
            "Lig" => Self::Light,
            "SwingLfRig" => Self::SwingHorizontal,
            "SwUpDn" => Self::SwingVertical,
            "Quiet" => Self::Quiet,
            "Tur" => Self::Turbo,
            "StHt" => Self::SteadyHeat,
            "SvSt" => Self::EnergySaving,
            "HeatCoolType" => Self::HeatCoolType,
            "TemRec" => Self::TemperatureRecord,
            "TemSen" => Self::TemperatureSensor,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the exact column name used on the wire.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Power => "Pow",
            Self::Mode => "Mod",
            Self::SetTemperature => "SetTem",
            Self::TemperatureUnit => "TemUn",
            Self::FanSpeed => "WdSpd",
            Self::FreshAir => "Air",
            Self::XFan => "Blo",
            Self::Health => "Health",
            Self::Sleep => "SwhSlp",
            Self::Light => "Lig",
            Self::SwingHorizontal => "SwingLfRig",
            Self::SwingVertical => "SwUpDn",
            Self::Quiet => "Quiet",
            Self::Turbo => "Tur",
            Self::SteadyHeat => "StHt",
            Self::EnergySaving => "SvSt",
            Self::HeatCoolType => "HeatCoolType",
            Self::TemperatureRecord => "TemRec",
            Self::TemperatureSensor => "TemSen",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A primitive parameter value.
///
/// Every column in the observed command set is a small integer.  Some
/// firmware reports a handful of string columns (host names, versions); those
/// pass through as [`ParameterValue::Text`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterValue {
    Int(i64),
    Text(String),
}

impl ParameterValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Converts a JSON array element into a value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedValue`] for floats, booleans,
    /// nulls, arrays, and objects.
    pub fn from_json(column: &str, value: &Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int).ok_or_else(|| {
                ProtocolError::UnsupportedValue {
                    column: column.to_string(),
                    value: value.to_string(),
                }
            }),
            Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(ProtocolError::UnsupportedValue {
                column: column.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Order-preserving map from parameter name to value.
///
/// Backed by a `Vec` because maps are tiny (at most a few dozen entries) and
/// the column order must survive a decode/encode cycle.  Inserting an
/// existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(ParameterName, ParameterValue)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zips parallel `columns`/`values` arrays from a reply.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LengthMismatch`] if the arrays differ in
    /// length (checked before any entry is built), or
    /// [`ProtocolError::UnsupportedValue`] for a non-primitive value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use aircon_core::{ParameterMap, ParameterName};
    /// use serde_json::json;
    ///
    /// let cols = vec!["Pow".to_string(), "Mod".to_string()];
    /// let map = ParameterMap::from_columns(&cols, &[json!(1), json!(2)]).unwrap();
    /// assert_eq!(map.get_int(&ParameterName::Power), Some(1));
    /// assert_eq!(map.get_int(&ParameterName::Mode), Some(2));
    /// ```
    pub fn from_columns(columns: &[String], values: &[Value]) -> Result<Self, ProtocolError> {
        if columns.len() != values.len() {
            return Err(ProtocolError::LengthMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let mut map = Self::new();
        for (column, value) in columns.iter().zip(values) {
            let value = ParameterValue::from_json(column, value)?;
            map.insert(ParameterName::from_wire(column), value);
        }
        Ok(map)
    }

    /// Splits the map into parallel wire arrays, preserving order.
    pub fn to_columns(&self) -> (Vec<String>, Vec<Value>) {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_wire().to_string(), value.to_json()))
            .unzip()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(
        &mut self,
        name: ParameterName,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: ParameterName, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &ParameterName) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_int(&self, name: &ParameterName) -> Option<i64> {
        self.get(name).and_then(ParameterValue::as_int)
    }

    pub fn contains(&self, name: &ParameterName) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, &ParameterValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    pub fn names(&self) -> impl Iterator<Item = &ParameterName> {
        self.entries.iter().map(|(n, _)| n)
    }
}

impl FromIterator<(ParameterName, ParameterValue)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (ParameterName, ParameterValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl fmt::Display for ParameterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
