//! Mock parameter store for testing

use super::{from_fixed, to_fixed, ParamError, ParamKind, ParamStore};
use std::vec::Vec;

/// Static definition of one mock parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    /// Parameter name (informational)
    pub name: &'static str,
    /// Storage kind
    pub kind: ParamKind,
    /// Persistent identifier, stable across "rebuilds" (reorderings)
    pub unique_id: u16,
    /// Minimum allowed value for validated writes
    pub min: f32,
    /// Maximum allowed value for validated writes
    pub max: f32,
    /// Default value
    pub default: f32,
}

impl ParamDef {
    /// Fixed-point parameter definition
    pub const fn fixed(name: &'static str, unique_id: u16, min: f32, max: f32) -> Self {
        Self {
            name,
            kind: ParamKind::FixedPoint,
            unique_id,
            min,
            max,
            default: 0.0,
        }
    }

    /// Float spot value definition
    pub const fn float(name: &'static str, unique_id: u16) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            unique_id,
            min: f32::MIN,
            max: f32::MAX,
            default: 0.0,
        }
    }
}

/// Mock parameter store backed by a definition table
#[derive(Debug, Clone)]
pub struct MockParamStore {
    defs: Vec<ParamDef>,
    values: Vec<f32>,
}

impl MockParamStore {
    /// Create a store from a definition table, all values at their defaults
    pub fn new(defs: &[ParamDef]) -> Self {
        Self {
            defs: defs.to_vec(),
            values: defs.iter().map(|d| d.default).collect(),
        }
    }

    /// Parameter name (test diagnostics)
    pub fn name(&self, index: usize) -> &'static str {
        self.defs[index].name
    }

    /// Reorder the enumeration while keeping unique ids attached
    ///
    /// Simulates a firmware rebuild that shuffles the parameter enumeration:
    /// `order[new_index] = old_index`. Values move with their definitions.
    pub fn reordered(&self, order: &[usize]) -> Self {
        Self {
            defs: order.iter().map(|&i| self.defs[i]).collect(),
            values: order.iter().map(|&i| self.values[i]).collect(),
        }
    }

    fn validate(&self, index: usize, value: f32) -> Result<(), ParamError> {
        let def = &self.defs[index];
        if value < def.min || value > def.max {
            return Err(ParamError::ValueOutOfRange);
        }
        Ok(())
    }
}

impl ParamStore for MockParamStore {
    fn count(&self) -> usize {
        self.defs.len()
    }

    fn kind(&self, index: usize) -> ParamKind {
        self.defs[index].kind
    }

    fn get_float(&self, index: usize) -> f32 {
        self.values[index]
    }

    fn set_float(&mut self, index: usize, value: f32) {
        self.values[index] = value;
    }

    fn set_fixed(&mut self, index: usize, raw: i32) -> Result<(), ParamError> {
        let value = from_fixed(raw);
        self.validate(index, value)?;
        self.values[index] = value;
        Ok(())
    }

    fn get_raw(&self, index: usize) -> u32 {
        to_fixed(self.values[index]) as u32
    }

    fn set_raw(&mut self, index: usize, raw: u32) -> Result<(), ParamError> {
        self.set_fixed(index, raw as i32)
    }

    fn unique_id(&self, index: usize) -> u16 {
        self.defs[index].unique_id
    }

    fn index_from_unique_id(&self, unique_id: u16) -> Option<usize> {
        self.defs.iter().position(|d| d.unique_id == unique_id)
    }
}
