//! Enumerations and identifiers shared by lines, stops and trips.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Kind of service a line or stop belongs to.
///
/// The remote service reuses numeric ids across the two networks, so every
/// line and stop is identified by its id *together with* its transport type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransportType {
    /// City buses ("U").
    Urban,
    /// Extra-urban buses, trains and cableways ("E").
    Suburban,
}

impl TransportType {
    /// All transport types.
    pub const ALL: [TransportType; 2] = [TransportType::Urban, TransportType::Suburban];

    /// Wire/database code for this transport type.
    ///
    /// ```
    /// use transit_types::TransportType;
    ///
    /// assert_eq!(TransportType::Urban.code(), "U");
    /// assert_eq!(TransportType::Suburban.code(), "E");
    /// ```
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TransportType::Urban => "U",
            TransportType::Suburban => "E",
        }
    }
}

impl FromStr for TransportType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U" => Ok(TransportType::Urban),
            "E" => Ok(TransportType::Suburban),
            other => Err(ParseError::UnknownTransportType(other.to_string())),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Urban => write!(f, "urban"),
            TransportType::Suburban => write!(f, "suburban"),
        }
    }
}

/// Geographic area a line is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Area {
    Suburban1 = 1,
    Suburban2 = 2,
    Suburban3 = 3,
    Suburban4 = 4,
    Suburban5 = 5,
    Suburban6 = 6,
    Railway = 7,
    Funicular = 8,
    UrbanPergine = 21,
    UrbanAltoGarda = 22,
    UrbanTrento = 23,
    UrbanRovereto = 24,
}

impl Area {
    /// Every area known to the service, in code order.
    pub const ALL: [Area; 12] = [
        Area::Suburban1,
        Area::Suburban2,
        Area::Suburban3,
        Area::Suburban4,
        Area::Suburban5,
        Area::Suburban6,
        Area::Railway,
        Area::Funicular,
        Area::UrbanPergine,
        Area::UrbanAltoGarda,
        Area::UrbanTrento,
        Area::UrbanRovereto,
    ];

    /// Numeric area code used by the remote service.
    #[must_use]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Parse an area code where `0` means "no area".
    ///
    /// ```
    /// use transit_types::Area;
    ///
    /// assert_eq!(Area::from_optional_code(0), Ok(None));
    /// assert_eq!(Area::from_optional_code(23), Ok(Some(Area::UrbanTrento)));
    /// assert!(Area::from_optional_code(99).is_err());
    /// ```
    pub fn from_optional_code(code: i64) -> Result<Option<Self>, ParseError> {
        if code == 0 {
            Ok(None)
        } else {
            Self::try_from(code).map(Some)
        }
    }
}

impl TryFrom<i64> for Area {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Area::ALL
            .iter()
            .copied()
            .find(|area| i64::from(area.code()) == value)
            .ok_or(ParseError::UnknownArea(value))
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Suburban1 => write!(f, "Suburban area 1"),
            Area::Suburban2 => write!(f, "Suburban area 2"),
            Area::Suburban3 => write!(f, "Suburban area 3"),
            Area::Suburban4 => write!(f, "Suburban area 4"),
            Area::Suburban5 => write!(f, "Suburban area 5"),
            Area::Suburban6 => write!(f, "Suburban area 6"),
            Area::Railway => write!(f, "Railway"),
            Area::Funicular => write!(f, "Funicular"),
            Area::UrbanPergine => write!(f, "Pergine"),
            Area::UrbanAltoGarda => write!(f, "Alto Garda"),
            Area::UrbanTrento => write!(f, "Trento"),
            Area::UrbanRovereto => write!(f, "Rovereto"),
        }
    }
}

/// Travel direction of a trip along its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Outbound run.
    Forward,
    /// Return run.
    Backward,
    /// Both directions; used as a "no filter" value.
    ForwardAndBackward,
}

impl Direction {
    /// Wire code, `None` for [`Direction::ForwardAndBackward`].
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Direction::Forward => Some(0),
            Direction::Backward => Some(1),
            Direction::ForwardAndBackward => None,
        }
    }

    /// Whether a trip travelling in `self` passes this filter.
    #[must_use]
    pub fn matches_filter(&self, filter: Direction) -> bool {
        filter == Direction::ForwardAndBackward || *self == filter
    }
}

impl TryFrom<i64> for Direction {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Forward),
            1 => Ok(Direction::Backward),
            other => Err(ParseError::UnknownDirection(other)),
        }
    }
}

/// Compass orientation of a stop relative to its street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CardinalPoint {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}

impl CardinalPoint {
    /// Short label ("N", "NE", ...).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        match self {
            CardinalPoint::East => "E",
            CardinalPoint::NorthEast => "NE",
            CardinalPoint::North => "N",
            CardinalPoint::NorthWest => "NW",
            CardinalPoint::West => "W",
            CardinalPoint::SouthWest => "SW",
            CardinalPoint::South => "S",
            CardinalPoint::SouthEast => "SE",
        }
    }
}

impl FromStr for CardinalPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "E" | "EAST" => Ok(CardinalPoint::East),
            "NE" | "NORTHEAST" => Ok(CardinalPoint::NorthEast),
            "N" | "NORTH" => Ok(CardinalPoint::North),
            "NW" | "NORTHWEST" => Ok(CardinalPoint::NorthWest),
            "W" | "WEST" => Ok(CardinalPoint::West),
            "SW" | "SOUTHWEST" => Ok(CardinalPoint::SouthWest),
            "S" | "SOUTH" => Ok(CardinalPoint::South),
            "SE" | "SOUTHEAST" => Ok(CardinalPoint::SouthEast),
            _ => Err(ParseError::UnknownCardinalPoint(s.to_string())),
        }
    }
}

impl fmt::Display for CardinalPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Identity of a line: `(id, transport type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineKey {
    pub id: i64,
    pub transport_type: TransportType,
}

impl LineKey {
    #[must_use]
    pub fn new(id: i64, transport_type: TransportType) -> Self {
        Self { id, transport_type }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.transport_type.code(), self.id)
    }
}

/// Identity of a stop: `(id, transport type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StopKey {
    pub id: i64,
    pub transport_type: TransportType,
}

impl StopKey {
    #[must_use]
    pub fn new(id: i64, transport_type: TransportType) -> Self {
        Self { id, transport_type }
    }
}

impl fmt::Display for StopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.transport_type.code(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_type_round_trip_codes() {
        for t in TransportType::ALL {
            assert_eq!(t.code().parse::<TransportType>().unwrap(), t);
        }
        assert!("X".parse::<TransportType>().is_err());
    }

    #[test]
    fn test_area_codes_are_unique() {
        let mut codes: Vec<u8> = Area::ALL.iter().map(Area::code).collect();
        codes.dedup();
        assert_eq!(codes.len(), Area::ALL.len());
    }

    #[test]
    fn test_direction_filter() {
        assert!(Direction::Forward.matches_filter(Direction::ForwardAndBackward));
        assert!(Direction::Backward.matches_filter(Direction::Backward));
        assert!(!Direction::Backward.matches_filter(Direction::Forward));
    }

    #[test]
    fn test_direction_from_code() {
        assert_eq!(Direction::try_from(0), Ok(Direction::Forward));
        assert_eq!(Direction::try_from(1), Ok(Direction::Backward));
        assert_eq!(Direction::try_from(2), Err(ParseError::UnknownDirection(2)));
    }

    #[test]
    fn test_cardinal_point_parsing() {
        assert_eq!("ne".parse::<CardinalPoint>(), Ok(CardinalPoint::NorthEast));
        assert_eq!("South".parse::<CardinalPoint>(), Ok(CardinalPoint::South));
        assert!("up".parse::<CardinalPoint>().is_err());
    }

    #[test]
    fn test_keys_display() {
        assert_eq!(LineKey::new(5, TransportType::Urban).to_string(), "U/5");
        assert_eq!(StopKey::new(10, TransportType::Suburban).to_string(), "E/10");
    }
}
