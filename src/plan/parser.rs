//! Hardened flight plan parser.
//!
//! Input is a SimBrief-style OFP document in JSON:
//!
//! ```json
//! {
//!   "params":      { "request_id": "123456", "units": "kgs" },
//!   "general":     { "icao_airline": "DLH", "flight_number": "400" },
//!   "origin":      { "icao_code": "EDDF" },
//!   "destination": { "icao_code": "KJFK" },
//!   "aircraft":    { "icaocode": "A343" },
//!   "fuel":        { "plan_ramp": "52340" },
//!   "weights":     { "cargo": "8120", "pax_count": "231" }
//! }
//! ```
//!
//! Numbers may be JSON numbers or numeric strings.  Before anything is
//! parsed the raw bytes are screened: markup declarations (document type,
//! entity, external identifiers) are rejected outright, as are payloads
//! over the size limit.

use serde::Deserialize;

use crate::config::PlanConfig;
use crate::error::ParseError;
use crate::units::MassUnit;

use super::{FlightPlan, PlanId, RouteInfo};

/// Bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub max_payload_bytes: usize,
    pub max_passengers: u32,
    pub max_fuel_kg: f64,
    pub max_cargo_kg: f64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::from(&PlanConfig::default())
    }
}

impl From<&PlanConfig> for PlanLimits {
    fn from(cfg: &PlanConfig) -> Self {
        Self {
            max_payload_bytes: cfg.max_payload_bytes,
            max_passengers: cfg.max_passengers,
            max_fuel_kg: cfg.max_fuel_kg,
            max_cargo_kg: cfg.max_cargo_kg,
        }
    }
}

// ---------------------------------------------------------------------------
// Markup screening
// ---------------------------------------------------------------------------

/// Declaration keywords that are never accepted after `<!`.
const FORBIDDEN_DECLARATIONS: [(&[u8], &str); 5] = [
    (b"DOCTYPE", "document type declaration"),
    (b"ENTITY", "entity declaration"),
    (b"ELEMENT", "element declaration"),
    (b"ATTLIST", "attribute list declaration"),
    (b"NOTATION", "notation declaration"),
];

const EXTERNAL_IDENTIFIERS: [&[u8]; 2] = [b"SYSTEM", b"PUBLIC"];

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

/// Reject any markup declaration that could pull in external or expanded
/// content.  Runs on raw bytes, before decoding.
pub fn screen_markup(bytes: &[u8]) -> Result<(), ParseError> {
    let mut rest = bytes;
    while let Some(pos) = rest.windows(2).position(|w| w == b"<!") {
        let decl = &rest[pos + 2..];
        for (keyword, what) in FORBIDDEN_DECLARATIONS {
            if starts_with_ignore_case(decl, keyword) {
                return Err(ParseError::ForbiddenMarkup(what));
            }
        }
        let end = decl.iter().position(|&b| b == b'>').unwrap_or(decl.len());
        if EXTERNAL_IDENTIFIERS
            .iter()
            .any(|id| contains_ignore_case(&decl[..end], id))
        {
            return Err(ParseError::ForbiddenMarkup("external identifier"));
        }
        rest = decl;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

/// A value that may arrive as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_owned(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOfp {
    params: Option<RawParams>,
    general: Option<RawGeneral>,
    origin: Option<RawAirport>,
    destination: Option<RawAirport>,
    aircraft: Option<RawAircraft>,
    fuel: Option<RawFuel>,
    weights: Option<RawWeights>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParams {
    request_id: Option<Scalar>,
    units: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGeneral {
    icao_airline: Option<String>,
    flight_number: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAirport {
    icao_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAircraft {
    icaocode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFuel {
    plan_ramp: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWeights {
    cargo: Option<Scalar>,
    pax_count: Option<Scalar>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn quantity(
    value: Option<&Scalar>,
    field: &'static str,
) -> Result<f64, ParseError> {
    let v = value.ok_or(ParseError::MissingField(field))?;
    let n = v.as_f64().ok_or(ParseError::OutOfRange(field))?;
    if !n.is_finite() || n < 0.0 {
        return Err(ParseError::OutOfRange(field));
    }
    Ok(n)
}

fn text(value: Option<&String>) -> String {
    value.map(|s| s.trim().to_owned()).unwrap_or_default()
}

/// Parse and validate a plan document.
pub fn parse_plan(bytes: &[u8], limits: &PlanLimits) -> Result<FlightPlan, ParseError> {
    if bytes.len() > limits.max_payload_bytes {
        return Err(ParseError::TooLarge {
            len: bytes.len(),
            max: limits.max_payload_bytes,
        });
    }
    screen_markup(bytes)?;

    let doc = core::str::from_utf8(bytes).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let raw: RawOfp =
        serde_json::from_str(doc).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let params = raw.params.unwrap_or_default();
    let id = params
        .request_id
        .as_ref()
        .map(Scalar::as_text)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingField("params.request_id"))?;

    let unit = match params.units.as_deref() {
        None => MassUnit::Kilograms,
        Some(tag) => MassUnit::from_tag(tag).ok_or(ParseError::OutOfRange("params.units"))?,
    };

    let fuel = raw.fuel.unwrap_or_default();
    let weights = raw.weights.unwrap_or_default();

    let fuel_kg = unit.to_kg(quantity(fuel.plan_ramp.as_ref(), "fuel.plan_ramp")?);
    if fuel_kg > limits.max_fuel_kg {
        return Err(ParseError::OutOfRange("fuel.plan_ramp"));
    }
    let cargo_kg = unit.to_kg(quantity(weights.cargo.as_ref(), "weights.cargo")?);
    if cargo_kg > limits.max_cargo_kg {
        return Err(ParseError::OutOfRange("weights.cargo"));
    }
    let pax = quantity(weights.pax_count.as_ref(), "weights.pax_count")?;
    if pax.fract() != 0.0 || pax > f64::from(limits.max_passengers) {
        return Err(ParseError::OutOfRange("weights.pax_count"));
    }

    let general = raw.general.unwrap_or_default();
    let callsign = format!(
        "{}{}",
        text(general.icao_airline.as_ref()),
        general
            .flight_number
            .as_ref()
            .map(Scalar::as_text)
            .unwrap_or_default()
    );

    Ok(FlightPlan {
        id: PlanId(id),
        fuel_kg,
        cargo_kg,
        passengers: pax as u32,
        route: RouteInfo {
            origin: text(raw.origin.unwrap_or_default().icao_code.as_ref()),
            destination: text(raw.destination.unwrap_or_default().icao_code.as_ref()),
            callsign,
            aircraft_type: text(raw.aircraft.unwrap_or_default().icaocode.as_ref()),
        },
    })
}
