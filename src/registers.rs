//! Named signal catalogue.
//!
//! The [`RegisterMap`] is the single source of truth for controller
//! addresses: every logical signal (a setpoint, a measured temperature, a
//! relay flag) is declared once with its address, kind, and optional valid
//! range, and looked up by name everywhere else.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a signal is laid out in the controller's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// A 32-bit float stored in two consecutive holding registers,
    /// high word first.
    #[serde(rename = "float32")]
    Float32Pair,
    /// A single-bit coil.
    Coil,
}

impl SignalKind {
    /// Return the string name for this signal kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Float32Pair => "float32",
            SignalKind::Coil => "coil",
        }
    }
}

/// An immutable description of one named signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDescriptor {
    /// Signal name, unique within the catalogue.
    pub name: String,
    /// Starting register address (Float32Pair) or coil bit index (Coil).
    pub address: u16,
    /// Memory layout of the signal.
    pub kind: SignalKind,
    /// Inclusive bounds for accepted write values. Only meaningful for
    /// Float32Pair signals.
    pub valid_range: Option<(f32, f32)>,
}

impl SignalDescriptor {
    /// Number of 16-bit words the signal occupies.
    pub fn word_count(&self) -> u16 {
        match self.kind {
            SignalKind::Float32Pair => 2,
            SignalKind::Coil => 1,
        }
    }
}

/// Catalogue construction errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("duplicate signal name '{0}'")]
    DuplicateName(String),
    #[error("signals '{first}' and '{second}' overlap at {kind} address {address}")]
    Overlap {
        first: String,
        second: String,
        kind: &'static str,
        address: u16,
    },
    #[error("signal '{0}': register pair does not fit at address 65535")]
    AddressOverflow(String),
    #[error("signal '{name}': invalid range [{min}, {max}]")]
    InvalidRange { name: String, min: f32, max: f32 },
    #[error("signal '{0}': valid_range is only meaningful for float32 signals")]
    RangeOnCoil(String),
}

/// Lookup and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum RegisterMapError {
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
    #[error("value {value} for '{name}' outside valid range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// The static name → descriptor catalogue, built once at startup.
#[derive(Debug)]
pub struct RegisterMap {
    by_name: HashMap<String, SignalDescriptor>,
    // Declaration order, so poll cycles walk signals deterministically.
    order: Vec<String>,
}

impl RegisterMap {
    /// Build a catalogue, rejecting duplicate names and overlapping
    /// address ranges of the same kind.
    pub fn new(signals: Vec<SignalDescriptor>) -> Result<Self, CatalogueError> {
        let mut by_name = HashMap::with_capacity(signals.len());
        let mut order = Vec::with_capacity(signals.len());
        let mut claimed: HashMap<(SignalKind, u16), String> = HashMap::new();

        for signal in signals {
            if by_name.contains_key(&signal.name) {
                return Err(CatalogueError::DuplicateName(signal.name));
            }

            if signal.kind == SignalKind::Float32Pair && signal.address == u16::MAX {
                return Err(CatalogueError::AddressOverflow(signal.name));
            }

            if let Some((min, max)) = signal.valid_range {
                if signal.kind == SignalKind::Coil {
                    return Err(CatalogueError::RangeOnCoil(signal.name));
                }
                if !(min <= max) {
                    return Err(CatalogueError::InvalidRange {
                        name: signal.name,
                        min,
                        max,
                    });
                }
            }

            for offset in 0..signal.word_count() {
                let address = signal.address + offset;
                if let Some(first) = claimed.get(&(signal.kind, address)) {
                    return Err(CatalogueError::Overlap {
                        first: first.clone(),
                        second: signal.name,
                        kind: signal.kind.as_str(),
                        address,
                    });
                }
                claimed.insert((signal.kind, address), signal.name.clone());
            }

            order.push(signal.name.clone());
            by_name.insert(signal.name.clone(), signal);
        }

        Ok(Self { by_name, order })
    }

    /// Look up a signal by name.
    pub fn resolve(&self, name: &str) -> Result<&SignalDescriptor, RegisterMapError> {
        self.by_name
            .get(name)
            .ok_or_else(|| RegisterMapError::UnknownSignal(name.to_string()))
    }

    /// Check a write value against the signal's declared range, inclusive on
    /// both bounds. Coil signals and unranged floats always validate.
    pub fn validate_range(&self, name: &str, value: f32) -> Result<(), RegisterMapError> {
        let signal = self.resolve(name)?;

        if let Some((min, max)) = signal.valid_range {
            if !(min <= value && value <= max) {
                return Err(RegisterMapError::OutOfRange {
                    name: name.to_string(),
                    value,
                    min,
                    max,
                });
            }
        }

        Ok(())
    }

    /// Iterate descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalDescriptor> {
        self.order.iter().map(|name| &self.by_name[name])
    }

    /// Number of signals in the catalogue.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(name: &str, address: u16, range: Option<(f32, f32)>) -> SignalDescriptor {
        SignalDescriptor {
            name: name.to_string(),
            address,
            kind: SignalKind::Float32Pair,
            valid_range: range,
        }
    }

    fn coil(name: &str, address: u16) -> SignalDescriptor {
        SignalDescriptor {
            name: name.to_string(),
            address,
            kind: SignalKind::Coil,
            valid_range: None,
        }
    }

    #[test]
    fn test_resolve() {
        let map = RegisterMap::new(vec![
            float("setpoint_1", 18, Some((-80.0, 80.0))),
            coil("circuit1_auto", 0),
        ])
        .unwrap();

        assert_eq!(map.resolve("setpoint_1").unwrap().address, 18);
        assert_eq!(map.resolve("circuit1_auto").unwrap().kind, SignalKind::Coil);
        assert!(matches!(
            map.resolve("nope"),
            Err(RegisterMapError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_iteration_order() {
        let map = RegisterMap::new(vec![
            float("b", 10, None),
            float("a", 0, None),
            coil("c", 5),
        ])
        .unwrap();

        let names: Vec<_> = map.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = RegisterMap::new(vec![float("x", 0, None), float("x", 10, None)]).unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateName(n) if n == "x"));
    }

    #[test]
    fn test_pair_overlap_rejected() {
        // A pair at 18 occupies words 18 and 19; a pair at 19 collides.
        let err = RegisterMap::new(vec![float("a", 18, None), float("b", 19, None)]).unwrap_err();
        assert!(matches!(err, CatalogueError::Overlap { address: 19, .. }));
    }

    #[test]
    fn test_same_address_different_kind_allowed() {
        // Coil 18 and register pair 18 live in different address spaces.
        let map = RegisterMap::new(vec![float("temp", 18, None), coil("relay", 18)]).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_pair_at_last_address_rejected() {
        let err = RegisterMap::new(vec![float("a", u16::MAX, None)]).unwrap_err();
        assert!(matches!(err, CatalogueError::AddressOverflow(_)));
    }

    #[test]
    fn test_range_on_coil_rejected() {
        let bad = SignalDescriptor {
            name: "relay".to_string(),
            address: 0,
            kind: SignalKind::Coil,
            valid_range: Some((0.0, 1.0)),
        };
        assert!(matches!(
            RegisterMap::new(vec![bad]),
            Err(CatalogueError::RangeOnCoil(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = RegisterMap::new(vec![float("a", 0, Some((80.0, -80.0)))]).unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidRange { .. }));
    }

    #[test]
    fn test_validate_range_inclusive() {
        let map = RegisterMap::new(vec![
            float("setpoint_1", 18, Some((-80.0, 80.0))),
            float("unbounded", 20, None),
            coil("relay", 0),
        ])
        .unwrap();

        // Bounds themselves are accepted.
        assert!(map.validate_range("setpoint_1", -80.0).is_ok());
        assert!(map.validate_range("setpoint_1", 80.0).is_ok());
        assert!(map.validate_range("setpoint_1", 0.0).is_ok());

        assert!(matches!(
            map.validate_range("setpoint_1", 80.001),
            Err(RegisterMapError::OutOfRange { .. })
        ));
        assert!(matches!(
            map.validate_range("setpoint_1", -80.001),
            Err(RegisterMapError::OutOfRange { .. })
        ));
        // NaN never satisfies an inclusive range.
        assert!(map.validate_range("setpoint_1", f32::NAN).is_err());

        assert!(map.validate_range("unbounded", 1.0e9).is_ok());
        assert!(map.validate_range("relay", 42.0).is_ok());
    }
}
